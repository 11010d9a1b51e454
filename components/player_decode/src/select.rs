//! Decoder-type selection (§4.11 "Decoder factory selection"): given a
//! track's format and whether tunnel/passthrough modes were requested,
//! decide which of the four decoder kinds to instantiate.

use mediacore_types::{is_passthrough_capable_mime, is_subtitle_mime, is_tunnel_capable_mime, MediaFormat};

/// Which decoder kind a track should be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// Software-or-device-codec path through a render (§4.7).
    Normal,
    /// No-codec byte aggregation straight to an offload sink (§4.8).
    Passthrough,
    /// Hardware-side rendering via the codec's own sink (§4.9).
    Tunnel,
    /// Text/bitmap subtitle parsing (§4.10).
    Subtitle,
}

/// Selects a [`DecoderKind`] for `format`, given whether tunnel mode and
/// audio passthrough were requested by the caller. The rules, in order:
///
/// 1. `Subtitle` if the mime looks like a text/subtitle track.
/// 2. `Tunnel` if tunnel mode was requested and the mime is tunnel-capable.
/// 3. `Passthrough` if tunnel wasn't selected and either passthrough was
///    requested or the mime is already PCM.
/// 4. `Normal` otherwise.
pub fn select_decoder_kind(
    format: &MediaFormat,
    tunnel_requested: bool,
    passthrough_requested: bool,
) -> DecoderKind {
    if is_subtitle_mime(&format.mime) {
        return DecoderKind::Subtitle;
    }
    if tunnel_requested && is_tunnel_capable_mime(&format.mime) {
        return DecoderKind::Tunnel;
    }
    let is_pcm = format.mime.eq_ignore_ascii_case("audio/pcm") || format.mime.ends_with("/pcm");
    if passthrough_requested || is_pcm {
        if is_passthrough_capable_mime(&format.mime) || is_pcm {
            return DecoderKind::Passthrough;
        }
    }
    DecoderKind::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_mime_always_wins() {
        let format = MediaFormat::with_mime("text/vtt");
        assert_eq!(select_decoder_kind(&format, true, true), DecoderKind::Subtitle);
    }

    #[test]
    fn tunnel_requires_both_flag_and_capable_mime() {
        let format = MediaFormat::with_mime("video/hevc");
        assert_eq!(select_decoder_kind(&format, true, false), DecoderKind::Tunnel);
        assert_eq!(select_decoder_kind(&format, false, false), DecoderKind::Normal);
    }

    #[test]
    fn passthrough_requires_capable_mime_or_pcm() {
        let ac3 = MediaFormat::with_mime("audio/ac3");
        assert_eq!(select_decoder_kind(&ac3, false, true), DecoderKind::Passthrough);

        let pcm = MediaFormat::with_mime("audio/pcm");
        assert_eq!(select_decoder_kind(&pcm, false, false), DecoderKind::Passthrough);

        let unsupported = MediaFormat::with_mime("audio/vnd.proprietary");
        assert_eq!(select_decoder_kind(&unsupported, false, true), DecoderKind::Normal);
    }

    #[test]
    fn tunnel_capable_video_falls_back_to_normal_without_tunnel_mode() {
        let format = MediaFormat::with_mime("video/avc");
        assert_eq!(select_decoder_kind(&format, false, false), DecoderKind::Normal);
    }
}
