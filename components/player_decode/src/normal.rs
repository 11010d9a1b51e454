//! Normal decoder (§4.7): drives an external codec, forwarding decoded
//! frames to a render.

use std::sync::Arc;

use mediacore_types::{
    AudioSampleFormat, Codec, CodecCallback, CodecConfig, ContentSource, FrameSink, MediaFormat,
    MediaFrame, MediaPacket, PacketFlags, PixelFormat, PlayerConfig, PlayerError, SourceError,
    TrackType,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::base::{DecoderActor, DecoderCommand, DecoderEvent};
use crate::packet_queue::PacketQueue;

struct NormalCodecCallback {
    sender: mpsc::UnboundedSender<DecoderCommand>,
}

impl CodecCallback for NormalCodecCallback {
    fn on_input_buffer_available(&self, index: usize) {
        let _ = self.sender.send(DecoderCommand::InputBufferAvailable(index));
    }
    fn on_output_buffer_available(&self, index: usize) {
        let _ = self.sender.send(DecoderCommand::OutputBufferAvailable(index));
    }
    fn on_output_format_changed(&self, format: MediaFormat) {
        let _ = self.sender.send(DecoderCommand::OutputFormatChanged(format));
    }
    fn on_error(&self, err: PlayerError) {
        let _ = self.sender.send(DecoderCommand::CodecError(err));
    }
}

/// A normal (software or device-codec-backed) audio or video decoder.
pub struct NormalDecoder {
    track_type: TrackType,
    source: Arc<dyn ContentSource>,
    codec: Box<dyn Codec>,
    sink: Arc<dyn FrameSink>,
    events: mpsc::UnboundedSender<DecoderEvent>,
    config: PlayerConfig,
    packet_queue: PacketQueue,
    current_format: Option<MediaFormat>,
    pending_input_request: bool,
    running: bool,
    eos_queued: bool,
    self_tx: Option<mpsc::UnboundedSender<DecoderCommand>>,
}

impl NormalDecoder {
    /// Creates a decoder for `track_type`, pulling from `source` through
    /// `codec` and forwarding decoded frames to `sink`.
    pub fn new(
        track_type: TrackType,
        source: Arc<dyn ContentSource>,
        codec: Box<dyn Codec>,
        sink: Arc<dyn FrameSink>,
        events: mpsc::UnboundedSender<DecoderEvent>,
        config: PlayerConfig,
    ) -> Self {
        let packet_queue = PacketQueue::new(config.frame_queue_bound);
        Self {
            track_type,
            source,
            codec,
            sink,
            events,
            config,
            packet_queue,
            current_format: None,
            pending_input_request: false,
            running: false,
            eos_queued: false,
            self_tx: None,
        }
    }

    fn request_input(&mut self) {
        if self.pending_input_request || self.eos_queued || !self.running {
            return;
        }
        match self.source.dequeue_access_unit(self.track_type) {
            Ok(packet) => {
                self.packet_queue.queue(packet);
            }
            Err(SourceError::WouldBlock) => {
                let _ = self.source.feed_more_es_data();
                self.pending_input_request = true;
                let Some(self_tx) = self.self_tx.clone() else {
                    return;
                };
                let delay_us = self.config.input_retry_delay_us;
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_micros(delay_us)).await;
                    let _ = self_tx.send(DecoderCommand::RequestMoreInput);
                });
            }
            Err(SourceError::EndOfStream) => {
                self.packet_queue.queue(MediaPacket::eos(self.track_type));
                self.eos_queued = true;
            }
            Err(SourceError::Error(msg)) => {
                let _ = self.events.send(DecoderEvent::Error(PlayerError::Unknown(msg)));
            }
        }
    }

    fn fill_input_buffer(&mut self, index: usize) {
        let Some(mut buffer) = self.codec.get_input_buffer(index) else {
            return;
        };
        match self.packet_queue.dequeue() {
            Some(packet) => {
                let data = buffer.data_mut();
                let len = packet.payload.len().min(data.len());
                data[..len].copy_from_slice(&packet.payload[..len]);
                buffer.set_range(0, len);
                buffer.set_pts_us(packet.pts_us);
                buffer.set_flags(packet.flags);
                if self.codec.queue_input_buffer(buffer).is_err() {
                    warn!(track = ?self.track_type, "failed to queue input buffer");
                }
            }
            None => {
                // No packet ready; drop the buffer silently, per §4.7.
            }
        }
        self.request_input();
    }

    fn drain_output_buffer(&mut self, index: usize) {
        let Some(buffer) = self.codec.get_output_buffer(index) else {
            return;
        };
        let pts_us = buffer.pts_us();
        let flags = buffer.flags();
        if flags.end_of_stream {
            let _ = self.events.send(DecoderEvent::Eos);
        }
        let format = self.current_format.as_ref();
        let frame = match self.track_type {
            TrackType::Audio => MediaFrame::audio(
                pts_us,
                0,
                mediacore_types::AudioFrameInfo {
                    sample_rate: format.and_then(|f| f.sample_rate).unwrap_or(0),
                    channels: format.and_then(|f| f.channel_layout).unwrap_or(0) as u8,
                    channel_layout: format.and_then(|f| f.channel_layout).unwrap_or(0),
                    // A normal decoder's codec always emits PCM; the encoded
                    // mime on `format` describes the *input*, not this output.
                    format: AudioSampleFormat::Pcm16,
                },
                buffer.data().to_vec(),
            ),
            _ => MediaFrame::video(
                pts_us,
                0,
                mediacore_types::VideoFrameInfo {
                    width: format.and_then(|f| f.width).unwrap_or(0),
                    height: format.and_then(|f| f.height).unwrap_or(0),
                    stride: 0,
                    pixel_format: format
                        .and_then(|f| f.pixel_format)
                        .unwrap_or(PixelFormat::HardwareSurface),
                },
                buffer.data().to_vec(),
            ),
        };
        // The codec is only ever touched from this loop; the release
        // callback posts the rendered flag back in rather than reaching
        // into `self.codec` from whatever thread the render fires on.
        if let Some(self_tx) = self.self_tx.clone() {
            let release: Box<dyn FnOnce(bool) + Send> = Box::new(move |rendered| {
                let _ = self_tx.send(DecoderCommand::OutputBufferReleased { index, rendered });
            });
            self.sink.render(frame, release);
        }
    }
}

impl DecoderActor for NormalDecoder {
    fn bind_self_sender(&mut self, sender: mpsc::UnboundedSender<DecoderCommand>) {
        self.self_tx = Some(sender.clone());
        let callback = Arc::new(NormalCodecCallback { sender });
        self.codec.set_callback(callback);
    }

    fn handle(&mut self, cmd: DecoderCommand) -> bool {
        match cmd {
            DecoderCommand::Configure(format) => {
                self.current_format = Some(format.clone());
                let config = CodecConfig {
                    mime: format.mime.clone(),
                    format,
                    media_type: self.track_type,
                    video_sink: None,
                };
                if let Err(e) = self.codec.configure(config) {
                    let _ = self.events.send(DecoderEvent::Error(e));
                }
            }
            DecoderCommand::SetVideoRender(_) => {
                // Not applicable: a normal decoder's output always goes
                // through a software render, not a hardware sink.
            }
            DecoderCommand::Start => {
                self.running = true;
                if self.codec.start().is_ok() {
                    self.request_input();
                }
            }
            DecoderCommand::Pause(ack) => {
                self.running = false;
                let _ = ack.send(());
            }
            DecoderCommand::Resume => {
                self.running = true;
                self.request_input();
            }
            DecoderCommand::Flush => {
                let _ = self.codec.flush();
                self.packet_queue.clear();
                self.pending_input_request = false;
                self.eos_queued = false;
            }
            DecoderCommand::Shutdown => {
                let _ = self.codec.stop();
                let _ = self.codec.release();
                return false;
            }
            DecoderCommand::InputBufferAvailable(index) => {
                self.pending_input_request = false;
                self.fill_input_buffer(index);
            }
            DecoderCommand::OutputBufferAvailable(index) => {
                self.drain_output_buffer(index);
            }
            DecoderCommand::OutputFormatChanged(format) => {
                self.current_format = Some(format.clone());
                let event = match self.track_type {
                    TrackType::Audio => DecoderEvent::AudioOutputFormatChanged(format),
                    _ => DecoderEvent::VideoSizeChanged(format),
                };
                let _ = self.events.send(event);
            }
            DecoderCommand::CodecError(err) => {
                let _ = self.events.send(DecoderEvent::Error(err));
            }
            DecoderCommand::RequestMoreInput => {
                self.pending_input_request = false;
                self.request_input();
            }
            DecoderCommand::OutputBufferReleased { index, rendered } => {
                if self.codec.release_output_buffer(index, rendered).is_err() {
                    warn!(track = ?self.track_type, index, "failed to release output buffer");
                }
            }
            DecoderCommand::BufferConsumed { .. } => {
                debug!(track = ?self.track_type, "ignoring passthrough-only message");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::spawn_decoder_loop;
    use mediacore_types::{
        AudioFrameInfo, CodecBuffer, PlayerResult, SourceFlags, SourceNotify, VideoFrameInfo,
    };
    use std::sync::Mutex;

    struct FakePackets {
        packets: Mutex<std::collections::VecDeque<Result<MediaPacket, SourceError>>>,
    }

    #[async_trait::async_trait]
    impl ContentSource for FakePackets {
        fn set_notify(&self, _notify: Arc<dyn SourceNotify>) {}
        async fn prepare(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn start(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn stop(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn pause(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn resume(&self) -> PlayerResult<()> {
            Ok(())
        }
        async fn seek_to(&self, _pts_us: i64, _mode: mediacore_types::SeekMode) -> PlayerResult<()> {
            Ok(())
        }
        fn dequeue_access_unit(&self, _track_type: TrackType) -> Result<MediaPacket, SourceError> {
            self.packets
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SourceError::EndOfStream))
        }
        fn get_track_info(&self, _track_type: TrackType) -> Option<MediaFormat> {
            None
        }
        fn feed_more_es_data(&self) -> Result<(), SourceError> {
            Ok(())
        }
        fn flags(&self) -> SourceFlags {
            SourceFlags::default()
        }
    }

    struct CapturingSink {
        audio_frames: Mutex<Vec<AudioFrameInfo>>,
        video_frames: Mutex<Vec<VideoFrameInfo>>,
    }

    impl FrameSink for CapturingSink {
        fn render(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
            if let Some(info) = frame.audio_info() {
                self.audio_frames.lock().unwrap().push(info.clone());
            }
            if let Some(info) = frame.video_info() {
                self.video_frames.lock().unwrap().push(info.clone());
            }
            release(true);
        }
    }

    struct FakeCodecBuffer {
        index: usize,
        data: Vec<u8>,
        range: usize,
        pts_us: i64,
        flags: PacketFlags,
    }

    impl FakeCodecBuffer {
        fn new(index: usize) -> Self {
            Self {
                index,
                data: vec![0u8; 64],
                range: 0,
                pts_us: 0,
                flags: PacketFlags::default(),
            }
        }
    }

    impl CodecBuffer for FakeCodecBuffer {
        fn index(&self) -> usize {
            self.index
        }
        fn data(&self) -> &[u8] {
            &self.data[..self.range]
        }
        fn data_mut(&mut self) -> &mut [u8] {
            &mut self.data
        }
        fn set_range(&mut self, offset: usize, size: usize) {
            self.range = offset + size;
        }
        fn pts_us(&self) -> i64 {
            self.pts_us
        }
        fn set_pts_us(&mut self, pts_us: i64) {
            self.pts_us = pts_us;
        }
        fn flags(&self) -> PacketFlags {
            self.flags
        }
        fn set_flags(&mut self, flags: PacketFlags) {
            self.flags = flags;
        }
    }

    /// A codec stand-in that echoes whatever it is handed straight back out
    /// as a decoded buffer, so tests exercise the decoder's own bookkeeping
    /// rather than any real transform.
    struct FakeCodec {
        callback: Mutex<Option<Arc<dyn CodecCallback>>>,
        pending_output: Mutex<Option<(i64, PacketFlags, Vec<u8>)>>,
    }

    impl Codec for FakeCodec {
        fn configure(&mut self, _config: CodecConfig) -> PlayerResult<()> {
            Ok(())
        }
        fn set_callback(&mut self, callback: Arc<dyn CodecCallback>) {
            *self.callback.lock().unwrap() = Some(callback);
        }
        fn start(&mut self) -> PlayerResult<()> {
            if let Some(cb) = self.callback.lock().unwrap().clone() {
                cb.on_input_buffer_available(0);
            }
            Ok(())
        }
        fn stop(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn flush(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn release(&mut self) -> PlayerResult<()> {
            Ok(())
        }
        fn get_input_buffer(&mut self, index: usize) -> Option<Box<dyn CodecBuffer>> {
            Some(Box::new(FakeCodecBuffer::new(index)))
        }
        fn queue_input_buffer(&mut self, buffer: Box<dyn CodecBuffer>) -> PlayerResult<()> {
            *self.pending_output.lock().unwrap() =
                Some((buffer.pts_us(), buffer.flags(), buffer.data().to_vec()));
            if let Some(cb) = self.callback.lock().unwrap().clone() {
                cb.on_output_buffer_available(0);
            }
            Ok(())
        }
        fn get_output_buffer(&mut self, index: usize) -> Option<Box<dyn CodecBuffer>> {
            let (pts_us, flags, data) = self.pending_output.lock().unwrap().take()?;
            let len = data.len();
            let mut buffer = FakeCodecBuffer::new(index);
            buffer.data[..len].copy_from_slice(&data);
            buffer.range = len;
            buffer.pts_us = pts_us;
            buffer.flags = flags;
            Some(Box::new(buffer))
        }
        fn release_output_buffer(&mut self, _index: usize, _render: bool) -> PlayerResult<()> {
            Ok(())
        }
    }

    fn packet(pts_us: i64) -> Result<MediaPacket, SourceError> {
        Ok(MediaPacket::new(TrackType::Audio, pts_us, vec![7u8; 8]))
    }

    #[tokio::test]
    async fn configured_format_reaches_the_decoded_frame() {
        let source = Arc::new(FakePackets {
            packets: Mutex::new(vec![packet(0)].into()),
        });
        let codec = FakeCodec {
            callback: Mutex::new(None),
            pending_output: Mutex::new(None),
        };
        let sink = Arc::new(CapturingSink {
            audio_frames: Mutex::new(Vec::new()),
            video_frames: Mutex::new(Vec::new()),
        });
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let decoder = NormalDecoder::new(
            TrackType::Audio,
            source,
            Box::new(codec),
            sink.clone(),
            events_tx,
            PlayerConfig::default(),
        );
        let handle = spawn_decoder_loop(decoder);
        handle.post(DecoderCommand::Configure(MediaFormat {
            mime: "audio/mp4a-latm".to_string(),
            sample_rate: Some(48_000),
            channel_layout: Some(2),
            pixel_format: None,
            width: None,
            height: None,
        }));
        handle.post(DecoderCommand::Start);
        tokio::task::yield_now().await;

        let frames = sink.audio_frames.lock().unwrap().clone();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sample_rate, 48_000);
        assert_eq!(frames[0].channels, 2);
        assert_eq!(frames[0].channel_layout, 2);
    }

    #[tokio::test]
    async fn output_format_changed_updates_subsequent_frames() {
        let source = Arc::new(FakePackets {
            packets: Mutex::new(vec![packet(0), packet(1_000)].into()),
        });
        let codec = FakeCodec {
            callback: Mutex::new(None),
            pending_output: Mutex::new(None),
        };
        let sink = Arc::new(CapturingSink {
            audio_frames: Mutex::new(Vec::new()),
            video_frames: Mutex::new(Vec::new()),
        });
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let decoder = NormalDecoder::new(
            TrackType::Audio,
            source,
            Box::new(codec),
            sink.clone(),
            events_tx,
            PlayerConfig::default(),
        );
        let handle = spawn_decoder_loop(decoder);
        handle.post(DecoderCommand::OutputFormatChanged(MediaFormat {
            mime: "audio/mp4a-latm".to_string(),
            sample_rate: Some(44_100),
            channel_layout: Some(6),
            pixel_format: None,
            width: None,
            height: None,
        }));
        handle.post(DecoderCommand::Start);
        tokio::task::yield_now().await;

        let frames = sink.audio_frames.lock().unwrap().clone();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sample_rate, 44_100);
        assert_eq!(frames[0].channels, 6);
    }
}
