//! The master clock: anchor, extrapolation, pause/resume, and rate control.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::{ClockSource, SystemClockSource};

/// Which side owns the anchor — informational only; the controller applies
/// the same extrapolation regardless, the owner just decides who calls
/// `update_anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockType {
    /// The audio render anchors the clock from its write position.
    #[default]
    Audio,
    /// The system clock anchors playback directly, e.g. audio-less video.
    System,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    media_us: i64,
    sys_us: i64,
}

struct Inner {
    anchor: Option<Anchor>,
    max_media_time_us: i64,
    rate: f32,
    clock_type: ClockType,
    paused: bool,
    frozen_media_us: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            anchor: None,
            max_media_time_us: 0,
            rate: 1.0,
            clock_type: ClockType::default(),
            paused: false,
            frozen_media_us: 0,
        }
    }
}

/// Lock-protected master clock shared by the renders (§4.1).
///
/// All methods take a single mutex and do no I/O, matching the original's
/// "short and non-blocking" contract.
pub struct AVSyncController {
    inner: Mutex<Inner>,
    clock_source: Arc<dyn ClockSource>,
}

impl AVSyncController {
    /// Creates a controller backed by the real wall clock.
    pub fn new() -> Self {
        Self::with_clock_source(Arc::new(SystemClockSource::new()))
    }

    /// Creates a controller backed by a caller-supplied clock source, for
    /// deterministic tests.
    pub fn with_clock_source(clock_source: Arc<dyn ClockSource>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock_source,
        }
    }

    /// Sets the anchor point. `max_media_time_us` is folded into the
    /// running maximum rather than overwriting it, so a stale or
    /// out-of-order call cannot move the clock backward.
    pub fn update_anchor(&self, media_pts_us: i64, sys_time_us: i64, max_media_time_us: i64) {
        let mut inner = self.inner.lock();
        let new_max = inner
            .max_media_time_us
            .max(max_media_time_us)
            .max(media_pts_us);
        inner.max_media_time_us = new_max;
        inner.anchor = Some(Anchor {
            media_us: media_pts_us,
            sys_us: sys_time_us,
        });
        if inner.paused {
            inner.frozen_media_us = media_pts_us.min(new_max);
        }
    }

    /// Returns the current extrapolated media time, clamped to
    /// `max_media_time_us`. Returns 0 when no anchor has ever been set.
    pub fn get_master_clock(&self) -> i64 {
        let inner = self.inner.lock();
        if inner.paused {
            return inner.frozen_media_us;
        }
        let Some(anchor) = inner.anchor else {
            return 0;
        };
        let now = self.clock_source.now_us();
        let elapsed = (now - anchor.sys_us).max(0);
        let raw = anchor.media_us + (elapsed as f64 * inner.rate as f64) as i64;
        raw.min(inner.max_media_time_us)
    }

    /// Sets the playback rate, clamped to non-negative.
    pub fn set_playback_rate(&self, rate: f32) {
        let mut inner = self.inner.lock();
        inner.rate = rate.max(0.0);
    }

    /// Records which side currently owns the anchor. Purely informational;
    /// the clock math does not depend on it.
    pub fn set_clock_type(&self, clock_type: ClockType) {
        self.inner.lock().clock_type = clock_type;
    }

    /// The side currently designated as the clock owner.
    pub fn clock_type(&self) -> ClockType {
        self.inner.lock().clock_type
    }

    /// Freezes extrapolation at the current media time.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if inner.paused {
            return;
        }
        let frozen = match inner.anchor {
            Some(anchor) => {
                let now = self.clock_source.now_us();
                let elapsed = (now - anchor.sys_us).max(0);
                let raw = anchor.media_us + (elapsed as f64 * inner.rate as f64) as i64;
                raw.min(inner.max_media_time_us)
            }
            None => 0,
        };
        inner.frozen_media_us = frozen;
        inner.paused = true;
    }

    /// Unfreezes extrapolation, rebasing the anchor to the frozen media
    /// time at the current instant so playback does not jump.
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        if !inner.paused {
            return;
        }
        let now = self.clock_source.now_us();
        inner.anchor = Some(Anchor {
            media_us: inner.frozen_media_us,
            sys_us: now,
        });
        inner.paused = false;
    }

    /// Drops the anchor and all settings, returning to the just-created
    /// state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = Inner::default();
    }

    /// Whether the controller is currently paused.
    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    /// Reads the controller's clock source directly, for callers (such as
    /// the audio render) that need a `sys_time_us` consistent with the one
    /// `get_master_clock` extrapolates against when calling
    /// [`Self::update_anchor`].
    pub fn now_us(&self) -> i64 {
        self.clock_source.now_us()
    }
}

impl Default for AVSyncController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AVSyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AVSyncController")
            .field("clock_us", &self.get_master_clock())
            .field("paused", &self.is_paused())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FakeClock(AtomicI64);

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(0)))
        }

        fn advance(&self, us: i64) {
            self.0.fetch_add(us, Ordering::SeqCst);
        }
    }

    impl ClockSource for FakeClock {
        fn now_us(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn fresh_controller_reads_zero() {
        let controller = AVSyncController::new();
        assert_eq!(controller.get_master_clock(), 0);
    }

    #[test]
    fn clock_extrapolates_forward_at_unit_rate() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.update_anchor(1_000_000, 0, 1_000_000);
        clock.advance(500_000);
        assert_eq!(controller.get_master_clock(), 1_500_000);
    }

    #[test]
    fn clock_clamps_to_max_media_time() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.update_anchor(1_000_000, 0, 1_200_000);
        clock.advance(1_000_000);
        assert_eq!(controller.get_master_clock(), 1_200_000);
    }

    #[test]
    fn rate_scales_extrapolation() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.set_playback_rate(2.0);
        controller.update_anchor(0, 0, 10_000_000);
        clock.advance(1_000_000);
        assert_eq!(controller.get_master_clock(), 2_000_000);
    }

    #[test]
    fn negative_rate_is_clamped_to_zero() {
        let controller = AVSyncController::new();
        controller.set_playback_rate(-3.0);
        controller.update_anchor(500_000, 0, 500_000);
        assert_eq!(controller.get_master_clock(), 500_000);
    }

    #[test]
    fn pause_freezes_the_clock() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.update_anchor(0, 0, 10_000_000);
        clock.advance(1_000_000);
        controller.pause();
        clock.advance(5_000_000);
        assert_eq!(controller.get_master_clock(), 1_000_000);
    }

    #[test]
    fn resume_rebases_without_jumping() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.update_anchor(0, 0, 10_000_000);
        clock.advance(1_000_000);
        controller.pause();
        clock.advance(5_000_000);
        controller.resume();
        assert_eq!(controller.get_master_clock(), 1_000_000);
        clock.advance(200_000);
        assert_eq!(controller.get_master_clock(), 1_200_000);
    }

    #[test]
    fn update_anchor_while_paused_updates_frozen_value() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.update_anchor(0, 0, 10_000_000);
        controller.pause();
        controller.update_anchor(2_000_000, clock.now_us(), 10_000_000);
        assert_eq!(controller.get_master_clock(), 2_000_000);
    }

    #[test]
    fn reset_drops_anchor_and_settings() {
        let clock = FakeClock::new();
        let controller = AVSyncController::with_clock_source(clock.clone());
        controller.update_anchor(1_000_000, 0, 1_000_000);
        controller.set_playback_rate(2.0);
        controller.pause();
        controller.reset();
        assert_eq!(controller.get_master_clock(), 0);
        assert!(!controller.is_paused());
    }
}
