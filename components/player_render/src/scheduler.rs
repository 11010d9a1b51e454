//! The render scheduler base (§4.3): a bounded frame queue paced against
//! either the master clock (video/subtitle) or a delegate-reported delay
//! (audio).

use std::collections::VecDeque;
use std::sync::Arc;

use mediacore_sync::{sync_decision, AVSyncController, SyncDecision};
use mediacore_types::{MediaFrame, PlayerConfig, PlayerResult};
use parking_lot::Mutex;
use tracing::{trace, warn};

/// Per-subclass rendering step. The base scheduler calls this once it has
/// decided a frame should be displayed now, and (for audio) uses the
/// returned delay to pace the next write.
pub trait RenderDelegate: Send {
    /// Renders `frame` and returns the delay, in microseconds, before the
    /// scheduler should consider the next one. Video and subtitle
    /// delegates return 0; the base class ignores it for them since their
    /// pacing comes from the clock comparison instead.
    fn render_frame_internal(&mut self, frame: &MediaFrame) -> PlayerResult<i64>;
}

/// How a scheduler paces its queue.
pub enum SchedulerMode {
    /// Paced by the delegate's own reported next-delay (audio).
    Audio,
    /// Paced by comparing each frame's PTS to the master clock (video,
    /// subtitle).
    Clocked {
        /// The shared master clock.
        sync: Arc<AVSyncController>,
    },
}

struct QueuedFrame {
    frame: MediaFrame,
    release: Box<dyn FnOnce(bool) + Send>,
}

struct State {
    queue: VecDeque<QueuedFrame>,
    running: bool,
    paused: bool,
    generation: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            running: false,
            paused: false,
            generation: 0,
        }
    }
}

struct Inner<D: RenderDelegate> {
    state: Mutex<State>,
    delegate: Mutex<D>,
    mode: SchedulerMode,
    config: PlayerConfig,
}

/// Generic frame scheduler shared by [`crate::AudioRender`],
/// [`crate::VideoRender`], and [`crate::SubtitleRender`].
///
/// Cheap to clone: state lives behind an `Arc`, so a clone can be moved
/// into the `tokio` task that backs a delayed re-check without the caller
/// juggling lifetimes.
pub struct RenderScheduler<D: RenderDelegate + 'static> {
    inner: Arc<Inner<D>>,
}

impl<D: RenderDelegate + 'static> Clone for RenderScheduler<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: RenderDelegate + 'static> RenderScheduler<D> {
    /// Creates a scheduler in the stopped, unpaused state.
    pub fn new(mode: SchedulerMode, delegate: D, config: PlayerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                delegate: Mutex::new(delegate),
                mode,
                config,
            }),
        }
    }

    /// Runs `f` with mutable access to the delegate, e.g. to open or close
    /// an external sink outside the render-frame path.
    pub fn with_delegate<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.inner.delegate.lock())
    }

    /// Starts accepting and scheduling frames.
    pub fn start(&self) {
        self.inner.state.lock().running = true;
    }

    /// Stops accepting frames; does not drain the queue (call [`Self::flush`]
    /// for that).
    pub fn stop(&self) {
        self.inner.state.lock().running = false;
    }

    /// Freezes delivery; queued frames stay queued.
    pub fn pause(&self) {
        self.inner.state.lock().paused = true;
    }

    /// Unfreezes delivery and, if frames are queued, schedules the next one
    /// immediately.
    pub fn resume(&self) {
        let has_queued = {
            let mut state = self.inner.state.lock();
            state.paused = false;
            !state.queue.is_empty()
        };
        if has_queued {
            self.schedule_next(0);
        }
    }

    /// Enqueues `frame`, firing `release(false)` for the oldest queued
    /// frame if the bound is reached, and `release(false)` immediately if
    /// the scheduler isn't running.
    pub fn render_frame(&self, frame: MediaFrame, release: Box<dyn FnOnce(bool) + Send>) {
        let mut state = self.inner.state.lock();
        if !state.running {
            release(false);
            return;
        }
        if state.queue.len() >= self.inner.config.frame_queue_bound {
            if let Some(dropped) = state.queue.pop_front() {
                warn!("render queue full, dropping oldest frame");
                (dropped.release)(false);
            }
        }
        state.queue.push_back(QueuedFrame { frame, release });
        let paused = state.paused;
        drop(state);
        if !paused {
            self.schedule_next(0);
        }
    }

    /// Drains the queue, firing `release(false)` for every pending frame,
    /// and bumps the generation so any in-flight delayed task becomes a
    /// no-op.
    pub fn flush(&self) {
        let mut state = self.inner.state.lock();
        while let Some(queued) = state.queue.pop_front() {
            (queued.release)(false);
        }
        state.generation += 1;
    }

    /// Bumps the generation and schedules the render task after `delay_us`.
    pub fn schedule_next(&self, delay_us: i64) {
        let generation = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.generation
        };
        let scheduler = self.clone();
        let delay_us = delay_us.max(0) as u64;
        tokio::spawn(async move {
            if delay_us > 0 {
                tokio::time::sleep(std::time::Duration::from_micros(delay_us)).await;
            }
            scheduler.run_render_task(generation);
        });
    }

    fn run_render_task(&self, generation: u64) {
        let mut state = self.inner.state.lock();
        if !state.running || state.paused {
            return;
        }
        if generation != state.generation {
            trace!(generation, current = state.generation, "stale render task, ignoring");
            return;
        }
        let Some(front) = state.queue.front() else {
            return;
        };

        match &self.inner.mode {
            SchedulerMode::Audio => {
                let pts_us = front.frame.pts_us;
                let result = self.inner.delegate.lock().render_frame_internal(&front.frame);
                let queued = state.queue.pop_front().expect("front checked above");
                drop(state);
                let ok = result.is_ok();
                let next_delay = result.unwrap_or(0);
                (queued.release)(ok);
                trace!(pts_us, next_delay, "audio frame rendered");
                self.schedule_next(next_delay);
            }
            SchedulerMode::Clocked { sync } => {
                let clock_us = sync.get_master_clock();
                let decision = sync_decision(front.frame.pts_us, clock_us, &self.inner.config);
                match decision {
                    SyncDecision::Drop => {
                        let queued = state.queue.pop_front().expect("front checked above");
                        drop(state);
                        (queued.release)(false);
                        self.schedule_next(0);
                    }
                    SyncDecision::Display => {
                        let _ = self.inner.delegate.lock().render_frame_internal(&front.frame);
                        let queued = state.queue.pop_front().expect("front checked above");
                        drop(state);
                        (queued.release)(true);
                        self.schedule_next(0);
                    }
                    SyncDecision::Wait { duration_us } => {
                        drop(state);
                        self.schedule_next(duration_us);
                    }
                }
            }
        }
    }

    /// Number of frames currently queued.
    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Whether the scheduler is running and unpaused.
    pub fn is_active(&self) -> bool {
        let state = self.inner.state.lock();
        state.running && !state.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacore_types::{TrackType, VideoFrameInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDelegate {
        rendered: Arc<AtomicUsize>,
    }

    impl RenderDelegate for CountingDelegate {
        fn render_frame_internal(&mut self, _frame: &MediaFrame) -> PlayerResult<i64> {
            self.rendered.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    fn video_frame(pts_us: i64) -> MediaFrame {
        MediaFrame::video(
            pts_us,
            33_000,
            VideoFrameInfo {
                width: 1920,
                height: 1080,
                stride: 0,
                pixel_format: mediacore_types::PixelFormat::Yuv420,
            },
            vec![],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn frame_dropped_when_not_running() {
        let sync = Arc::new(AVSyncController::new());
        let delegate = CountingDelegate {
            rendered: Arc::new(AtomicUsize::new(0)),
        };
        let scheduler = RenderScheduler::new(
            SchedulerMode::Clocked { sync },
            delegate,
            PlayerConfig::default(),
        );
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.render_frame(video_frame(0), Box::new(move |rendered| {
            let _ = tx.send(rendered);
        }));
        assert_eq!(rx.await.unwrap(), false);
        assert_eq!(scheduler.queue_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn on_time_frame_renders_and_releases_true() {
        let sync = Arc::new(AVSyncController::new());
        sync.update_anchor(0, 0, 0);
        let rendered_count = Arc::new(AtomicUsize::new(0));
        let delegate = CountingDelegate {
            rendered: rendered_count.clone(),
        };
        let scheduler = RenderScheduler::new(
            SchedulerMode::Clocked { sync: sync.clone() },
            delegate,
            PlayerConfig::default(),
        );
        scheduler.start();
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.render_frame(video_frame(0), Box::new(move |rendered| {
            let _ = tx.send(rendered);
        }));
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert_eq!(rx.await.unwrap(), true);
        assert_eq!(rendered_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn very_late_frame_is_dropped() {
        let sync = Arc::new(AVSyncController::new());
        sync.update_anchor(1_000_000, 0, 1_000_000);
        let delegate = CountingDelegate {
            rendered: Arc::new(AtomicUsize::new(0)),
        };
        let scheduler = RenderScheduler::new(
            SchedulerMode::Clocked { sync },
            delegate,
            PlayerConfig::default(),
        );
        scheduler.start();
        let (tx, rx) = tokio::sync::oneshot::channel();
        // Way behind the 1_000_000 clock with a 40ms drop threshold.
        scheduler.render_frame(video_frame(0), Box::new(move |rendered| {
            let _ = tx.send(rendered);
        }));
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert_eq!(rx.await.unwrap(), false);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_bound_drops_oldest() {
        let sync = Arc::new(AVSyncController::new());
        let delegate = CountingDelegate {
            rendered: Arc::new(AtomicUsize::new(0)),
        };
        let mut config = PlayerConfig::default();
        config.frame_queue_bound = 1;
        let scheduler = RenderScheduler::new(SchedulerMode::Clocked { sync }, delegate, config);
        // Running but paused: frames accumulate in the queue instead of
        // being dispatched, so the bound check inside `render_frame` is
        // what decides which one gets dropped.
        scheduler.start();
        scheduler.pause();

        let (tx1, rx1) = tokio::sync::oneshot::channel();
        let (tx2, rx2) = tokio::sync::oneshot::channel();
        scheduler.render_frame(video_frame(0), Box::new(move |r| { let _ = tx1.send(r); }));
        scheduler.render_frame(video_frame(1), Box::new(move |r| { let _ = tx2.send(r); }));

        assert_eq!(rx1.await.unwrap(), false);
        assert_eq!(scheduler.queue_len(), 1);

        scheduler.resume();
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert_eq!(rx2.await.unwrap(), true);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_prevents_delivery_until_resume() {
        let sync = Arc::new(AVSyncController::new());
        sync.update_anchor(0, 0, 0);
        let rendered_count = Arc::new(AtomicUsize::new(0));
        let delegate = CountingDelegate {
            rendered: rendered_count.clone(),
        };
        let scheduler = RenderScheduler::new(
            SchedulerMode::Clocked { sync },
            delegate,
            PlayerConfig::default(),
        );
        scheduler.start();
        scheduler.pause();
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.render_frame(video_frame(0), Box::new(move |r| { let _ = tx.send(r); }));
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        assert_eq!(rendered_count.load(Ordering::SeqCst), 0);
        scheduler.resume();
        tokio::time::advance(std::time::Duration::from_millis(1)).await;
        assert_eq!(rx.await.unwrap(), true);
    }
}
