//! Trait seams for the external collaborators the core consumes: content
//! source, codec, audio device, video sink, and the top-level listener.
//!
//! These are the only contact points between this crate and the
//! out-of-scope systems named in `SPEC_FULL.md` §1 (container parsing,
//! codec implementation, hardware drivers). Nothing in this crate or its
//! siblings implements them for real media — callers supply an adapter.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{PlayerError, PlayerResult};
use crate::format::{AudioSampleFormat, ChannelLayout, MediaFormat, OffloadInfo};
use crate::frame::MediaFrame;
use crate::packet::{MediaPacket, PacketFlags};
use crate::seek::{SeekMode, SourceFlags};
use crate::track::TrackType;

/// Error returned by a [`ContentSource`] poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No packet is available yet; the caller should retry later.
    WouldBlock,
    /// The track has no more packets.
    EndOfStream,
    /// A hard source error occurred.
    Error(String),
}

impl From<SourceError> for PlayerError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::WouldBlock => PlayerError::WouldBlock,
            SourceError::EndOfStream => PlayerError::EndOfStream,
            SourceError::Error(msg) => PlayerError::Unknown(msg),
        }
    }
}

/// Notifications a [`ContentSource`] delivers back to its owner (the
/// player state machine), ordered per §5.
pub trait SourceNotify: Send + Sync {
    /// The source finished (or failed) preparing.
    fn on_prepared(&self, result: PlayerResult<()>);
    /// The source's capability flags changed.
    fn on_flags_changed(&self, flags: SourceFlags);
    /// The video track's geometry changed.
    fn on_video_size_changed(&self, format: MediaFormat);
    /// Buffering has started.
    fn on_buffering_start(&self);
    /// Buffering progress, 0-100.
    fn on_buffering_update(&self, percent: i32);
    /// Buffering has ended.
    fn on_buffering_end(&self);
    /// Playback has reached the end of all tracks.
    fn on_completion(&self);
    /// The source hit an unrecoverable error.
    fn on_error(&self, err: PlayerError);
    /// The source wants more data pumped for `track_type`.
    fn on_fetch_data(&self, track_type: TrackType);
}

/// The content source contract (§6): URL/file/fd opening, probing, and
/// per-track packet delivery. Implemented by an out-of-scope collaborator;
/// this crate only depends on the trait. Stored as `Arc<dyn ContentSource>`
/// throughout the core, so the async methods are boxed via `async_trait`
/// rather than left as native `async fn`s, which a trait object cannot call.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Registers the notification sink the source will call back into.
    fn set_notify(&self, notify: Arc<dyn SourceNotify>);

    /// Begins preparing (probing) the source. May complete asynchronously;
    /// completion is signaled via [`SourceNotify::on_prepared`].
    async fn prepare(&self) -> PlayerResult<()>;
    /// Starts pumping data.
    async fn start(&self) -> PlayerResult<()>;
    /// Stops pumping data.
    async fn stop(&self) -> PlayerResult<()>;
    /// Pauses pumping data.
    async fn pause(&self) -> PlayerResult<()>;
    /// Resumes pumping data.
    async fn resume(&self) -> PlayerResult<()>;
    /// Seeks to `pts_us` using `mode`; blocks until the source reports a
    /// status, per the synchronous seek-reply pattern in §5.
    async fn seek_to(&self, pts_us: i64, mode: SeekMode) -> PlayerResult<()>;

    /// Pulls the next compressed packet for `track_type`, or an error
    /// indicating why none is available.
    fn dequeue_access_unit(&self, track_type: TrackType) -> Result<MediaPacket, SourceError>;
    /// The current format for `track_type`, if the track exists.
    fn get_track_info(&self, track_type: TrackType) -> Option<MediaFormat>;
    /// Gives the source a chance to pull more elementary-stream data after
    /// a decoder observed [`SourceError::WouldBlock`].
    fn feed_more_es_data(&self) -> Result<(), SourceError>;
    /// The source's capability flags.
    fn flags(&self) -> SourceFlags;
}

/// Configuration handed to [`Codec::configure`].
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// The track format being decoded.
    pub format: MediaFormat,
    /// Codec mime, duplicated from `format.mime` for convenience.
    pub mime: String,
    /// Whether this is an audio or video codec instance.
    pub media_type: TrackType,
    /// For the tunnel path: the sink the codec should render to directly.
    pub video_sink: Option<Arc<dyn VideoRenderSink>>,
}

/// An opaque, indexed codec buffer (input or output).
pub trait CodecBuffer: Send {
    /// Buffer index within the codec's buffer array.
    fn index(&self) -> usize;
    /// Valid byte range of the buffer.
    fn data(&self) -> &[u8];
    /// Mutable access to the buffer, for filling an input buffer.
    fn data_mut(&mut self) -> &mut [u8];
    /// Marks the valid sub-range of the buffer after a partial fill.
    fn set_range(&mut self, offset: usize, size: usize);
    /// Presentation timestamp associated with this buffer.
    fn pts_us(&self) -> i64;
    /// Sets the presentation timestamp.
    fn set_pts_us(&mut self, pts_us: i64);
    /// Packet flags associated with this buffer (keyframe, EOS, ...).
    fn flags(&self) -> PacketFlags;
    /// Sets the packet flags.
    fn set_flags(&mut self, flags: PacketFlags);
}

/// Callbacks a [`Codec`] invokes on its owner (the decoder).
pub trait CodecCallback: Send + Sync {
    /// An input buffer at `index` is free to be filled and queued.
    fn on_input_buffer_available(&self, index: usize);
    /// An output buffer at `index` is ready to be consumed and released.
    fn on_output_buffer_available(&self, index: usize);
    /// The codec's output format changed (e.g. late SPS/PPS).
    fn on_output_format_changed(&self, format: MediaFormat);
    /// The codec hit an unrecoverable error.
    fn on_error(&self, err: PlayerError);
}

/// The codec capability set a decoder drives (§4.7, §6). Implemented by an
/// out-of-scope collaborator — this crate treats the codec as opaque.
pub trait Codec: Send {
    /// Configures the codec for `config`.
    fn configure(&mut self, config: CodecConfig) -> PlayerResult<()>;
    /// Registers the callback sink.
    fn set_callback(&mut self, callback: Arc<dyn CodecCallback>);
    /// Starts the codec.
    fn start(&mut self) -> PlayerResult<()>;
    /// Stops the codec.
    fn stop(&mut self) -> PlayerResult<()>;
    /// Flushes buffered state without tearing the codec down.
    fn flush(&mut self) -> PlayerResult<()>;
    /// Tears the codec down.
    fn release(&mut self) -> PlayerResult<()>;
    /// Retrieves the input buffer at `index` for filling.
    fn get_input_buffer(&mut self, index: usize) -> Option<Box<dyn CodecBuffer>>;
    /// Queues a filled input buffer for decoding.
    fn queue_input_buffer(&mut self, buffer: Box<dyn CodecBuffer>) -> PlayerResult<()>;
    /// Retrieves the output buffer at `index` for consumption.
    fn get_output_buffer(&mut self, index: usize) -> Option<Box<dyn CodecBuffer>>;
    /// Releases an output buffer exactly once; `render` indicates whether
    /// the corresponding frame was (or will be) displayed.
    fn release_output_buffer(&mut self, index: usize, render: bool) -> PlayerResult<()>;
}

/// Configuration for an [`AudioTrack`] sink (§6).
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channel_layout: ChannelLayout,
    /// Sink sample format (PCM or an offload-encoded bitstream).
    pub format: AudioSampleFormat,
    /// Bytes per frame for PCM formats.
    pub frame_size: u32,
    /// Offload metadata, present only for encoded formats.
    pub offload_info: Option<OffloadInfo>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channel_layout: 2,
            format: AudioSampleFormat::Pcm16,
            frame_size: 4,
            offload_info: None,
        }
    }
}

/// A single opened audio output stream.
pub trait AudioTrack: Send {
    /// Opens the track with `config`.
    fn open(&mut self, config: AudioConfig) -> PlayerResult<()>;
    /// Starts playback.
    fn start(&mut self) -> PlayerResult<()>;
    /// Stops playback.
    fn stop(&mut self) -> PlayerResult<()>;
    /// Pauses playback.
    fn pause(&mut self) -> PlayerResult<()>;
    /// Flushes buffered audio.
    fn flush(&mut self) -> PlayerResult<()>;
    /// Closes the track, releasing device resources.
    fn close(&mut self) -> PlayerResult<()>;
    /// Writes PCM or encoded bytes; `blocking` requests the device block
    /// until space is available (the render always passes `false`).
    fn write(&mut self, data: &[u8], blocking: bool) -> PlayerResult<usize>;
    /// Total frames written since open.
    fn frames_written(&self) -> u64;
    /// Currently buffered duration in the device, in microseconds.
    fn buffer_duration_us(&self) -> i64;
    /// Device output latency in microseconds.
    fn latency_us(&self) -> i64;
    /// Milliseconds represented by one frame at the current config.
    fn msecs_per_frame(&self) -> f64;
    /// Attempts to apply a hardware playback rate; returns
    /// [`PlayerError::Unsupported`] if the device cannot do so.
    fn set_playback_rate(&mut self, rate: f32) -> PlayerResult<()>;
    /// Whether this track supports hardware playback-rate changes.
    fn supports_playback_rate(&self) -> bool;
    /// Whether the track is open and ready to accept writes.
    fn ready(&self) -> bool;
}

/// Platform audio device: a factory for [`AudioTrack`]s (§6).
pub trait AudioDevice: Send + Sync {
    /// One-time device initialization.
    fn init(&self) -> PlayerResult<()>;
    /// Creates a new, unopened audio track.
    fn create_audio_track(&self) -> PlayerResult<Box<dyn AudioTrack>>;
}

/// External video render sink (§6): the platform surface that actually
/// displays frames, owned by the video render.
pub trait VideoRenderSink: Send + Sync {
    /// Delivers a frame for display.
    fn on_frame(&self, frame: MediaFrame);
    /// The sink's own render latency, in microseconds.
    fn render_latency_us(&self) -> i64;
}

/// External subtitle sink (§4.10): receives parsed subtitle frames for
/// display. Distinct from [`VideoRenderSink`] since subtitle delivery
/// carries no render-latency feedback loop.
pub trait SubtitleSink: Send + Sync {
    /// Delivers a subtitle frame for display.
    fn on_subtitle(&self, frame: MediaFrame);
}

/// A decoder's downstream target: a render scheduler, decoupling the
/// decoder crate from any concrete render implementation.
pub trait FrameSink: Send + Sync {
    /// Enqueues `frame`; `release` must be invoked exactly once, with
    /// `true` if the frame was displayed/played and `false` if it was
    /// dropped.
    fn render(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>);
}

/// Top-level player events surfaced to the embedder.
pub trait PlayerListener: Send + Sync {
    /// An unrecoverable error occurred; repeated errors from the same
    /// track are collapsed by the caller before reaching this callback.
    fn on_error(&self, err: PlayerError);
    /// All instantiated tracks reached end-of-stream.
    fn on_completion(&self);
    /// The video track's dimensions changed.
    fn on_video_size_changed(&self, width: u32, height: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_maps_to_player_error() {
        let err: PlayerError = SourceError::WouldBlock.into();
        assert_eq!(err, PlayerError::WouldBlock);
        let err: PlayerError = SourceError::EndOfStream.into();
        assert_eq!(err, PlayerError::EndOfStream);
    }

    #[test]
    fn default_audio_config_is_stereo_pcm16() {
        let config = AudioConfig::default();
        assert_eq!(config.channel_layout, 2);
        assert_eq!(config.format, AudioSampleFormat::Pcm16);
    }
}
