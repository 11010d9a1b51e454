//! Subtitle decoder (§4.10): no codec, no aggregation. Each packet's
//! payload is forwarded as a subtitle frame tagged with a format hint
//! derived from the track's mime, matching the "byte-copy + format tag"
//! minimal parsing the design calls for.

use std::sync::Arc;

use mediacore_types::{
    ContentSource, FrameSink, MediaFormat, MediaFrame, PlayerConfig, PlayerError, SourceError,
    SubtitleFrameInfo, TrackType,
};
use tokio::sync::mpsc;

use crate::base::{DecoderActor, DecoderCommand, DecoderEvent};

/// Maps a subtitle track's mime to the format hint a sink uses to pick a
/// renderer.
fn format_hint_for_mime(mime: &str) -> String {
    let lower = mime.to_ascii_lowercase();
    if lower.ends_with("srt") {
        "srt".to_string()
    } else if lower.ends_with("ssa") {
        "ssa".to_string()
    } else if lower.ends_with("ass") {
        "ass".to_string()
    } else if lower.ends_with("vtt") {
        "vtt".to_string()
    } else {
        "opaque".to_string()
    }
}

/// The no-codec subtitle decoder.
pub struct SubtitleDecoder {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn FrameSink>,
    events: mpsc::UnboundedSender<DecoderEvent>,
    config: PlayerConfig,
    format_hint: String,
    running: bool,
    paused: bool,
    eos: bool,
    pending_input_request: bool,
    self_tx: Option<mpsc::UnboundedSender<DecoderCommand>>,
}

impl SubtitleDecoder {
    /// Creates a subtitle decoder pulling text packets from `source` and
    /// forwarding parsed frames to `sink`.
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
            format_hint: "opaque".to_string(),
            running: false,
            paused: false,
            eos: false,
            pending_input_request: false,
            self_tx: None,
        }
    }

    fn should_fetch(&self) -> bool {
        self.running && !self.paused && !self.eos && !self.pending_input_request
    }

    fn request_input(&mut self) {
        while self.should_fetch() {
            match self.source.dequeue_access_unit(TrackType::Subtitle) {
                Ok(packet) => {
                    if packet.flags.end_of_stream {
                        self.eos = true;
                        let _ = self.events.send(DecoderEvent::Eos);
                        break;
                    }
                    let frame = MediaFrame::subtitle(
                        packet.pts_us,
                        packet.duration_us.unwrap_or(0),
                        SubtitleFrameInfo {
                            format_hint: self.format_hint.clone(),
                        },
                        packet.payload,
                    );
                    // No cache to track and nothing to acknowledge; the
                    // release is a no-op, matching a no-codec decoder's
                    // exactly-once contract trivially.
                    self.sink.render(frame, Box::new(|_rendered| {}));
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
                    let _ = self.events.send(DecoderEvent::Eos);
                    break;
                }
                Err(SourceError::Error(msg)) => {
                    let _ = self.events.send(DecoderEvent::Error(PlayerError::Unknown(msg)));
                    break;
                }
            }
        }
    }
}

impl DecoderActor for SubtitleDecoder {
    fn bind_self_sender(&mut self, sender: mpsc::UnboundedSender<DecoderCommand>) {
        self.self_tx = Some(sender);
    }

    fn handle(&mut self, cmd: DecoderCommand) -> bool {
        match cmd {
            DecoderCommand::Configure(format) => {
                self.format_hint = format_hint_for_mime(&format.mime);
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
                self.pending_input_request = false;
                self.eos = false;
            }
            DecoderCommand::Shutdown => {
                return false;
            }
            DecoderCommand::InputBufferAvailable(_)
            | DecoderCommand::OutputBufferAvailable(_)
            | DecoderCommand::OutputFormatChanged(_)
            | DecoderCommand::OutputBufferReleased { .. }
            | DecoderCommand::BufferConsumed { .. } => {
                // No codec buffers in the subtitle path.
            }
            DecoderCommand::CodecError(err) => {
                let _ = self.events.send(DecoderEvent::Error(err));
            }
            DecoderCommand::RequestMoreInput => {
                self.pending_input_request = false;
                self.request_input();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::spawn_decoder_loop;
    use mediacore_types::{MediaPacket, SourceFlags, SourceNotify};
    use std::sync::Mutex;

    struct FakePackets {
        packets: Mutex<std::collections::VecDeque<Result<MediaPacket, SourceError>>>,
    }

    #[async_trait::async_trait]
    impl ContentSource for FakePackets {
        fn set_notify(&self, _notify: Arc<dyn SourceNotify>) {}
        async fn prepare(&self) -> mediacore_types::PlayerResult<()> {
            Ok(())
        }
        async fn start(&self) -> mediacore_types::PlayerResult<()> {
            Ok(())
        }
        async fn stop(&self) -> mediacore_types::PlayerResult<()> {
            Ok(())
        }
        async fn pause(&self) -> mediacore_types::PlayerResult<()> {
            Ok(())
        }
        async fn resume(&self) -> mediacore_types::PlayerResult<()> {
            Ok(())
        }
        async fn seek_to(
            &self,
            _pts_us: i64,
            _mode: mediacore_types::SeekMode,
        ) -> mediacore_types::PlayerResult<()> {
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
        frames: Mutex<Vec<(i64, String)>>,
    }

    impl FrameSink for CapturingSink {
        fn render(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
            let hint = frame.subtitle_info().unwrap().format_hint.clone();
            self.frames.lock().unwrap().push((frame.pts_us, hint));
            release(true);
        }
    }

    #[tokio::test]
    async fn forwards_each_packet_as_its_own_frame_with_the_configured_hint() {
        let source = Arc::new(FakePackets {
            packets: Mutex::new(
                vec![
                    Ok(MediaPacket::new(TrackType::Subtitle, 1_000, b"hello".to_vec())),
                    Ok(MediaPacket::new(TrackType::Subtitle, 2_000, b"world".to_vec())),
                ]
                .into(),
            ),
        });
        let sink = Arc::new(CapturingSink {
            frames: Mutex::new(Vec::new()),
        });
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let decoder = SubtitleDecoder::new(source, sink.clone(), events_tx, PlayerConfig::default());
        let handle = spawn_decoder_loop(decoder);
        handle.post(DecoderCommand::Configure(MediaFormat::with_mime("text/vtt")));
        handle.post(DecoderCommand::Start);
        tokio::task::yield_now().await;

        let frames = sink.frames.lock().unwrap().clone();
        assert_eq!(frames, vec![(1_000, "vtt".to_string()), (2_000, "vtt".to_string())]);
    }

    #[tokio::test]
    async fn end_of_stream_packet_reports_eos() {
        let source = Arc::new(FakePackets {
            packets: Mutex::new(vec![Ok(MediaPacket::eos(TrackType::Subtitle))].into()),
        });
        let sink = Arc::new(CapturingSink {
            frames: Mutex::new(Vec::new()),
        });
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let decoder = SubtitleDecoder::new(source, sink, events_tx, PlayerConfig::default());
        let handle = spawn_decoder_loop(decoder);
        handle.post(DecoderCommand::Start);
        tokio::task::yield_now().await;

        assert!(matches!(events_rx.recv().await, Some(DecoderEvent::Eos)));
    }
}
