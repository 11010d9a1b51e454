//! Video render (§4.5): forwards decoded frames to an external sink and
//! tracks geometry for video-size-changed notification.

use std::sync::Arc;

use parking_lot::Mutex;

use mediacore_sync::AVSyncController;
use mediacore_types::{
    FrameSink, MediaFrame, PlayerConfig, PlayerError, PlayerResult, VideoRenderSink,
};

use crate::scheduler::{RenderDelegate, RenderScheduler, SchedulerMode};

struct VideoRenderDelegate {
    sink: Arc<dyn VideoRenderSink>,
    on_size_changed: Option<Box<dyn Fn(u32, u32) + Send>>,
    current_size: Mutex<Option<(u32, u32)>>,
}

impl RenderDelegate for VideoRenderDelegate {
    fn render_frame_internal(&mut self, frame: &MediaFrame) -> PlayerResult<i64> {
        let info = frame
            .video_info()
            .ok_or_else(|| PlayerError::BadValue("video render given a non-video frame".into()))?;
        let size = (info.width, info.height);
        let mut current = self.current_size.lock();
        if *current != Some(size) {
            *current = Some(size);
            if let Some(cb) = &self.on_size_changed {
                cb(size.0, size.1);
            }
        }
        drop(current);
        self.sink.on_frame(frame.clone());
        Ok(0)
    }
}

/// The video-specialized render scheduler.
///
/// Always runs in [`SchedulerMode::Clocked`] mode: the base scheduler
/// compares each frame's PTS to the master clock and decides
/// display/drop/wait; this delegate only forwards to the sink once that
/// decision has already been made.
pub struct VideoRender {
    scheduler: RenderScheduler<VideoRenderDelegate>,
}

impl VideoRender {
    /// Creates a video render that forwards to `sink`, paced against
    /// `sync`. `on_size_changed` fires once per distinct `(width, height)`.
    pub fn new(
        sink: Arc<dyn VideoRenderSink>,
        sync: Arc<AVSyncController>,
        on_size_changed: Option<Box<dyn Fn(u32, u32) + Send>>,
        config: PlayerConfig,
    ) -> Self {
        let delegate = VideoRenderDelegate {
            sink,
            on_size_changed,
            current_size: Mutex::new(None),
        };
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

    /// Enqueues a decoded video frame with its release callback.
    pub fn render_frame(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        self.scheduler.render_frame(frame, release);
    }

    /// Number of frames currently queued.
    pub fn queue_len(&self) -> usize {
        self.scheduler.queue_len()
    }
}

impl FrameSink for VideoRender {
    fn render(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        self.render_frame(frame, release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacore_types::{PixelFormat, VideoFrameInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct FakeSink {
        frames: StdMutex<Vec<MediaFrame>>,
    }

    impl VideoRenderSink for FakeSink {
        fn on_frame(&self, frame: MediaFrame) {
            self.frames.lock().unwrap().push(frame);
        }
        fn render_latency_us(&self) -> i64 {
            0
        }
    }

    fn video_frame(pts_us: i64, width: u32, height: u32) -> MediaFrame {
        MediaFrame::video(
            pts_us,
            33_000,
            VideoFrameInfo {
                width,
                height,
                stride: 0,
                pixel_format: PixelFormat::Yuv420,
            },
            vec![],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn on_time_frame_forwards_to_sink() {
        let sink = Arc::new(FakeSink {
            frames: StdMutex::new(Vec::new()),
        });
        let sync = Arc::new(AVSyncController::new());
        sync.update_anchor(0, 0, 0);
        let render = VideoRender::new(sink.clone(), sync, None, PlayerConfig::default());
        render.start();
        let (tx, rx) = tokio::sync::oneshot::channel();
        render.render_frame(
            video_frame(0, 1920, 1080),
            Box::new(move |r| {
                let _ = tx.send(r);
            }),
        );
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert!(rx.await.unwrap());
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn size_change_fires_callback_once_per_distinct_size() {
        let sink = Arc::new(FakeSink {
            frames: StdMutex::new(Vec::new()),
        });
        let sync = Arc::new(AVSyncController::new());
        sync.update_anchor(0, 0, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let render = VideoRender::new(
            sink,
            sync,
            Some(Box::new(move |_w, _h| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
            PlayerConfig::default(),
        );
        render.start();

        let (tx1, rx1) = tokio::sync::oneshot::channel();
        render.render_frame(video_frame(0, 1920, 1080), Box::new(move |r| { let _ = tx1.send(r); }));
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        rx1.await.unwrap();

        let (tx2, rx2) = tokio::sync::oneshot::channel();
        render.render_frame(video_frame(1, 1920, 1080), Box::new(move |r| { let _ = tx2.send(r); }));
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        rx2.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
