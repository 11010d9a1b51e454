//! Tunnel decoder (§4.9): the same codec interface as the normal decoder,
//! but configured with a hardware video-render sink. The sink paces its
//! own display; the decoder never queues frames in software.

use std::sync::Arc;

use mediacore_types::{
    Codec, CodecCallback, CodecConfig, ContentSource, MediaFormat, PlayerConfig, PlayerError,
    SourceError, TrackType, VideoRenderSink,
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::base::{DecoderActor, DecoderCommand, DecoderEvent};
use crate::packet_queue::PacketQueue;

struct TunnelCodecCallback {
    sender: mpsc::UnboundedSender<DecoderCommand>,
}

impl CodecCallback for TunnelCodecCallback {
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

/// Hardware-rendered video decoder. Output buffers are released with
/// `render = true` immediately; the display hardware paces itself.
pub struct TunnelDecoder {
    source: Arc<dyn ContentSource>,
    codec: Box<dyn Codec>,
    sink: Arc<dyn VideoRenderSink>,
    events: mpsc::UnboundedSender<DecoderEvent>,
    config: PlayerConfig,
    packet_queue: PacketQueue,
    running: bool,
    pending_input_request: bool,
    self_tx: Option<mpsc::UnboundedSender<DecoderCommand>>,
}

impl TunnelDecoder {
    /// Creates a tunnel decoder for the video track, rendering through
    /// `sink`'s hardware path.
    pub fn new(
        source: Arc<dyn ContentSource>,
        codec: Box<dyn Codec>,
        sink: Arc<dyn VideoRenderSink>,
        events: mpsc::UnboundedSender<DecoderEvent>,
        config: PlayerConfig,
    ) -> Self {
        let packet_queue = PacketQueue::new(config.frame_queue_bound);
        Self {
            source,
            codec,
            sink,
            events,
            config,
            packet_queue,
            running: false,
            pending_input_request: false,
            self_tx: None,
        }
    }

    fn request_input(&mut self) {
        if self.pending_input_request || !self.running {
            return;
        }
        match self.source.dequeue_access_unit(TrackType::Video) {
            Ok(packet) => {
                self.packet_queue.queue(packet);
            }
            Err(SourceError::WouldBlock) => {
                let _ = self.source.feed_more_es_data();
                self.pending_input_request = true;
                if let Some(self_tx) = self.self_tx.clone() {
                    let delay_us = self.config.input_retry_delay_us;
                    tokio::spawn(async move {
                        tokio::time::sleep(std::time::Duration::from_micros(delay_us)).await;
                        let _ = self_tx.send(DecoderCommand::RequestMoreInput);
                    });
                }
            }
            Err(SourceError::EndOfStream) => {
                let _ = self.events.send(DecoderEvent::Eos);
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
                    warn!("tunnel decoder failed to queue input buffer");
                }
            }
            None => {
                // No packet ready; drop the buffer silently, per §4.7.
            }
        }
        self.request_input();
    }
}


impl DecoderActor for TunnelDecoder {
    fn bind_self_sender(&mut self, sender: mpsc::UnboundedSender<DecoderCommand>) {
        self.self_tx = Some(sender.clone());
        let callback = Arc::new(TunnelCodecCallback { sender });
        self.codec.set_callback(callback);
    }

    fn handle(&mut self, cmd: DecoderCommand) -> bool {
        match cmd {
            DecoderCommand::Configure(format) => {
                let config = CodecConfig {
                    mime: format.mime.clone(),
                    format,
                    media_type: TrackType::Video,
                    video_sink: Some(self.sink.clone()),
                };
                if let Err(e) = self.codec.configure(config) {
                    let _ = self.events.send(DecoderEvent::Error(e));
                }
            }
            DecoderCommand::SetVideoRender(sink) => {
                self.sink = sink;
            }
            DecoderCommand::Start => {
                self.running = true;
                if self.codec.start().is_ok() {
                    self.request_input();
                }
            }
            DecoderCommand::Pause(ack) => {
                // The hardware path cannot be frozen in place: flush and
                // stop the codec rather than pretend it is suspended.
                let _ = self.codec.flush();
                let _ = self.codec.stop();
                self.running = false;
                let _ = ack.send(());
            }
            DecoderCommand::Resume => {
                // Mirrors Pause: restart the codec rather than assume
                // suspended state survived.
                self.running = true;
                if self.codec.start().is_ok() {
                    self.request_input();
                }
            }
            DecoderCommand::Flush => {
                let _ = self.codec.flush();
                self.packet_queue.clear();
                self.pending_input_request = false;
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
                // The hardware path paces its own display; release
                // immediately with render = true.
                if self.codec.release_output_buffer(index, true).is_err() {
                    warn!(index, "tunnel decoder failed to release output buffer");
                }
            }
            DecoderCommand::OutputFormatChanged(format) => {
                let _ = self.events.send(DecoderEvent::VideoSizeChanged(format));
            }
            DecoderCommand::CodecError(err) => {
                let _ = self.events.send(DecoderEvent::Error(err));
            }
            DecoderCommand::RequestMoreInput => {
                self.pending_input_request = false;
                self.request_input();
            }
            DecoderCommand::OutputBufferReleased { .. } | DecoderCommand::BufferConsumed { .. } => {
                // Not applicable: the tunnel path never defers a release.
            }
        }
        true
    }
}
