//! Subtitle render (§4.10, rendering half): forwards parsed subtitle
//! frames to the external sink with no aggregation or codec involvement.

use std::sync::Arc;

use mediacore_sync::AVSyncController;
use mediacore_types::{
    FrameSink, MediaFrame, PlayerConfig, PlayerError, PlayerResult, SubtitleSink,
};

use crate::scheduler::{RenderDelegate, RenderScheduler, SchedulerMode};

struct SubtitleRenderDelegate {
    sink: Arc<dyn SubtitleSink>,
}

impl RenderDelegate for SubtitleRenderDelegate {
    fn render_frame_internal(&mut self, frame: &MediaFrame) -> PlayerResult<i64> {
        if frame.subtitle_info().is_none() {
            return Err(PlayerError::BadValue(
                "subtitle render given a non-subtitle frame".into(),
            ));
        }
        self.sink.on_subtitle(frame.clone());
        Ok(0)
    }
}

/// The subtitle-specialized render scheduler. Paced the same way as video
/// (clock comparison), since subtitle cues carry a PTS but no device
/// feedback loop of their own.
pub struct SubtitleRender {
    scheduler: RenderScheduler<SubtitleRenderDelegate>,
}

impl SubtitleRender {
    /// Creates a subtitle render that forwards to `sink`, paced against
    /// `sync`.
    pub fn new(sink: Arc<dyn SubtitleSink>, sync: Arc<AVSyncController>, config: PlayerConfig) -> Self {
        let delegate = SubtitleRenderDelegate { sink };
        Self {
            scheduler: RenderScheduler::new(SchedulerMode::Clocked { sync }, delegate, config),
        }
    }

    /// Starts the scheduler.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stops the scheduler.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Freezes delivery.
    pub fn pause(&self) {
        self.scheduler.pause();
    }

    /// Unfreezes delivery.
    pub fn resume(&self) {
        self.scheduler.resume();
    }

    /// Drains the queue, releasing every pending frame with `rendered = false`.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    /// Enqueues a parsed subtitle frame with its release callback.
    pub fn render_frame(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        self.scheduler.render_frame(frame, release);
    }
}

impl FrameSink for SubtitleRender {
    fn render(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        self.render_frame(frame, release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacore_types::SubtitleFrameInfo;
    use std::sync::Mutex;

    struct FakeSink {
        received: Mutex<Vec<String>>,
    }

    impl SubtitleSink for FakeSink {
        fn on_subtitle(&self, frame: MediaFrame) {
            if let Some(info) = frame.subtitle_info() {
                self.received.lock().unwrap().push(info.format_hint.clone());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subtitle_frame_forwards_to_sink() {
        let sink = Arc::new(FakeSink {
            received: Mutex::new(Vec::new()),
        });
        let sync = Arc::new(AVSyncController::new());
        sync.update_anchor(0, 0, 0);
        let render = SubtitleRender::new(sink.clone(), sync, PlayerConfig::default());
        render.start();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let frame = MediaFrame::subtitle(
            0,
            2_000_000,
            SubtitleFrameInfo {
                format_hint: "srt".to_string(),
            },
            b"hello".to_vec(),
        );
        render.render_frame(
            frame,
            Box::new(move |r| {
                let _ = tx.send(r);
            }),
        );
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert!(rx.await.unwrap());
        assert_eq!(sink.received.lock().unwrap()[0], "srt");
    }
}
