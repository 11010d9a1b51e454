//! Track formats and the authoritative mime lists used for decoder-type
//! selection (tunnel / passthrough / subtitle).

/// Pixel format of a decoded video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0.
    Yuv420,
    /// Planar YUV 4:2:2.
    Yuv422,
    /// Packed RGBA.
    Rgba,
    /// Opaque hardware surface; the payload is a platform handle, not bytes.
    HardwareSurface,
}

/// Sample format of a decoded (or passthrough) audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSampleFormat {
    /// 16-bit signed PCM.
    Pcm16,
    /// 24-bit signed PCM, packed.
    Pcm24Packed,
    /// 32-bit float PCM.
    PcmFloat,
    /// AAC-LC bitstream handed to an offload-capable sink.
    AacLc,
    /// AC-3 bitstream handed to an offload-capable sink.
    Ac3,
    /// Enhanced AC-3 (E-AC-3) bitstream.
    Eac3,
    /// DTS bitstream.
    Dts,
}

impl AudioSampleFormat {
    /// `true` for formats that require a device-side decoder (offload /
    /// pass-through), as opposed to raw PCM the sink plays directly.
    pub fn is_encoded(self) -> bool {
        !matches!(
            self,
            AudioSampleFormat::Pcm16 | AudioSampleFormat::Pcm24Packed | AudioSampleFormat::PcmFloat
        )
    }

    /// Bytes per sample-frame-channel for PCM formats; `None` for encoded
    /// formats, which have no fixed per-sample size.
    pub fn pcm_bytes_per_sample(self) -> Option<u32> {
        match self {
            AudioSampleFormat::Pcm16 => Some(2),
            AudioSampleFormat::Pcm24Packed => Some(3),
            AudioSampleFormat::PcmFloat => Some(4),
            _ => None,
        }
    }
}

/// Channel layout, modeled as a channel count; a real implementation would
/// distinguish layouts with the same count (e.g. 5.1 vs. stereo + sub), but
/// this core only needs count-equality for format-change detection.
pub type ChannelLayout = u16;

/// Offload metadata attached to an [`AudioConfig`](crate::AudioConfig) when
/// the sink receives an encoded bitstream instead of PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadInfo {
    /// Encoded sample format being offloaded.
    pub format: AudioSampleFormat,
    /// Sample rate of the encoded stream.
    pub sample_rate: u32,
    /// Channel layout of the encoded stream.
    pub channel_layout: ChannelLayout,
    /// Bit width of the source samples, for devices that need it.
    pub bit_width: u8,
}

/// Format describing a track: the identifying mime plus whichever of the
/// audio/video fields apply.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFormat {
    /// MIME-like codec identifier, e.g. `"video/avc"`, `"audio/mp4a-latm"`,
    /// `"text/vtt"`.
    pub mime: String,
    /// Sample rate in Hz, for audio tracks.
    pub sample_rate: Option<u32>,
    /// Channel layout, for audio tracks.
    pub channel_layout: Option<ChannelLayout>,
    /// Pixel format, for video tracks.
    pub pixel_format: Option<PixelFormat>,
    /// Frame width in pixels, for video tracks.
    pub width: Option<u32>,
    /// Frame height in pixels, for video tracks.
    pub height: Option<u32>,
}

impl MediaFormat {
    /// Creates a bare format carrying only a mime type.
    pub fn with_mime(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            sample_rate: None,
            channel_layout: None,
            pixel_format: None,
            width: None,
            height: None,
        }
    }
}

/// Authoritative mime list for the tunnel video path (§6): hardware-side
/// rendering is only attempted for these codecs.
const TUNNEL_CAPABLE_VIDEO_MIMES: &[&str] = &[
    "avc", "hevc", "h264", "h265", "mp4v-es", "vp8", "vp9", "av01",
];

/// Authoritative mime list for audio passthrough (§6).
const PASSTHROUGH_CAPABLE_AUDIO_MIMES: &[&str] = &[
    "aac",
    "ac3",
    "eac3",
    "dts",
    "dts-hd",
    "mp4a-latm",
    "mpeg",
    "vorbis",
    "flac",
    "opus",
];

fn mime_suffix_matches(mime: &str, candidates: &[&str]) -> bool {
    let lower = mime.to_ascii_lowercase();
    candidates
        .iter()
        .any(|c| lower == *c || lower.ends_with(&format!("/{c}")))
}

/// Whether `mime` names a video codec eligible for the hardware tunnel path.
pub fn is_tunnel_capable_mime(mime: &str) -> bool {
    mime_suffix_matches(mime, TUNNEL_CAPABLE_VIDEO_MIMES)
}

/// Whether `mime` names an audio codec a passthrough sink can decode itself.
pub fn is_passthrough_capable_mime(mime: &str) -> bool {
    mime_suffix_matches(mime, PASSTHROUGH_CAPABLE_AUDIO_MIMES)
}

/// Whether `mime` names a subtitle/text track, per the decoder factory's
/// selection rule (mime prefix `text/` or `subtitle/`).
pub fn is_subtitle_mime(mime: &str) -> bool {
    let lower = mime.to_ascii_lowercase();
    lower.starts_with("text/") || lower.starts_with("subtitle/")
}
