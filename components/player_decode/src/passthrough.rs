//! Passthrough decoder (§4.8): no codec. Aggregates small packets into a
//! staging buffer and forwards them to the audio render once any of
//! {buffer would overflow, a timestamp newly becomes available, EOS}.

use std::sync::Arc;

use mediacore_types::{
    AudioFrameInfo, AudioSampleFormat, ContentSource, FrameSink, MediaFormat, MediaFrame,
    PlayerConfig, PlayerError, SourceError, TrackType,
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::base::{DecoderActor, DecoderCommand, DecoderEvent};

/// Sentinel for "no timestamp known yet", matching the source's own
/// convention for untimed packets.
const NO_TIMESTAMP: i64 = -1;

/// Maps a passthrough track's mime to the offload sample format the sink
/// needs to open its device track with.
fn audio_format_for_mime(mime: &str) -> AudioSampleFormat {
    let lower = mime.to_ascii_lowercase();
    if lower.ends_with("eac3") {
        AudioSampleFormat::Eac3
    } else if lower.ends_with("ac3") {
        AudioSampleFormat::Ac3
    } else if lower.ends_with("dts") || lower.ends_with("dts-hd") {
        AudioSampleFormat::Dts
    } else {
        AudioSampleFormat::AacLc
    }
}

/// The no-codec audio passthrough decoder.
pub struct PassthroughDecoder {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn FrameSink>,
    events: mpsc::UnboundedSender<DecoderEvent>,
    config: PlayerConfig,
    staging: Vec<u8>,
    staging_pts_us: i64,
    cached_bytes: usize,
    generation: u64,
    running: bool,
    paused: bool,
    eos: bool,
    pending_input_request: bool,
    self_tx: Option<mpsc::UnboundedSender<DecoderCommand>>,
    format: Option<MediaFormat>,
}

impl PassthroughDecoder {
    /// Creates a passthrough decoder pulling audio packets from `source`
    /// and forwarding aggregated chunks to `sink`.
    pub fn new(
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn FrameSink>,
        events: mpsc::UnboundedSender<DecoderEvent>,
        config: PlayerConfig,
    ) -> Self {
        Self {
            source,
            sink,
            events,
            config,
            staging: Vec::new(),
            staging_pts_us: NO_TIMESTAMP,
            cached_bytes: 0,
            generation: 0,
            running: false,
            paused: false,
            eos: false,
            pending_input_request: false,
            self_tx: None,
            format: None,
        }
    }

    fn should_fetch(&self) -> bool {
        self.running
            && !self.paused
            && !self.eos
            && !self.pending_input_request
            && self.cached_bytes < self.config.passthrough_max_cached_bytes
    }

    fn request_input(&mut self) {
        while self.should_fetch() {
            match self.source.dequeue_access_unit(TrackType::Audio) {
                Ok(packet) => {
                    let newly_timed =
                        self.staging_pts_us == NO_TIMESTAMP && packet.pts_us != NO_TIMESTAMP;
                    if newly_timed && !self.staging.is_empty() {
                        self.flush_staging(false);
                    }
                    if self.staging.is_empty() {
                        self.staging_pts_us = packet.pts_us;
                    }
                    self.staging.extend_from_slice(&packet.payload);
                    if packet.flags.end_of_stream {
                        self.eos = true;
                        self.flush_staging(true);
                        break;
                    }
                    if self.staging.len() >= self.config.passthrough_aggregate_bytes {
                        self.flush_staging(false);
                    }
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
                    break;
                }
                Err(SourceError::EndOfStream) => {
                    self.eos = true;
                    self.flush_staging(true);
                    break;
                }
                Err(SourceError::Error(msg)) => {
                    let _ = self.events.send(DecoderEvent::Error(PlayerError::Unknown(msg)));
                    break;
                }
            }
        }
    }

    fn flush_staging(&mut self, is_eos: bool) {
        if self.staging.is_empty() && !is_eos {
            return;
        }
        let payload = std::mem::take(&mut self.staging);
        let bytes = payload.len();
        let pts_us = self.staging_pts_us;
        self.staging_pts_us = NO_TIMESTAMP;
        self.cached_bytes += bytes;

        let format = self.format.as_ref();
        let frame = MediaFrame::audio(
            pts_us,
            0,
            AudioFrameInfo {
                sample_rate: format.and_then(|f| f.sample_rate).unwrap_or(0),
                channels: format.and_then(|f| f.channel_layout).unwrap_or(0) as u8,
                channel_layout: format.and_then(|f| f.channel_layout).unwrap_or(0),
                format: format
                    .map(|f| audio_format_for_mime(&f.mime))
                    .unwrap_or(AudioSampleFormat::AacLc),
            },
            payload,
        );

        let generation = self.generation;
        let Some(self_tx) = self.self_tx.clone() else {
            return;
        };
        let release: Box<dyn FnOnce(bool) + Send> = Box::new(move |_rendered| {
            let _ = self_tx.send(DecoderCommand::BufferConsumed { generation, bytes });
        });
        self.sink.render(frame, release);

        if is_eos {
            let _ = self.events.send(DecoderEvent::Eos);
        }
    }
}

impl DecoderActor for PassthroughDecoder {
    fn bind_self_sender(&mut self, sender: mpsc::UnboundedSender<DecoderCommand>) {
        self.self_tx = Some(sender);
    }

    fn handle(&mut self, cmd: DecoderCommand) -> bool {
        match cmd {
            DecoderCommand::Configure(format) => {
                self.format = Some(format);
            }
            DecoderCommand::SetVideoRender(_) => {}
            DecoderCommand::Start => {
                self.running = true;
                self.request_input();
            }
            DecoderCommand::Pause(ack) => {
                self.paused = true;
                let _ = ack.send(());
            }
            DecoderCommand::Resume => {
                self.paused = false;
                self.request_input();
            }
            DecoderCommand::Flush => {
                self.staging.clear();
                self.staging_pts_us = NO_TIMESTAMP;
                self.cached_bytes = 0;
                self.pending_input_request = false;
                self.eos = false;
                self.generation += 1;
            }
            DecoderCommand::Shutdown => {
                return false;
            }
            DecoderCommand::InputBufferAvailable(_) | DecoderCommand::OutputBufferAvailable(_) => {
                // No codec buffers in the passthrough path.
            }
            DecoderCommand::OutputFormatChanged(_) => {}
            DecoderCommand::CodecError(err) => {
                let _ = self.events.send(DecoderEvent::Error(err));
            }
            DecoderCommand::RequestMoreInput => {
                self.pending_input_request = false;
                self.request_input();
            }
            DecoderCommand::OutputBufferReleased { .. } => {
                warn!("passthrough decoder received a codec-only message");
            }
            DecoderCommand::BufferConsumed { generation, bytes } => {
                if generation != self.generation {
                    return true;
                }
                self.cached_bytes = self.cached_bytes.saturating_sub(bytes);
                self.request_input();
            }
        }
        true
    }
}
