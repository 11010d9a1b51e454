//! The drop/display/wait decision a render makes for a frame relative to
//! the master clock.

use mediacore_types::PlayerConfig;

/// What a render should do with a frame it has decoded, given the current
/// master clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Render the frame now.
    Display,
    /// The frame is too far behind the clock to bother rendering.
    Drop,
    /// Hold the frame and check again after `duration_us`.
    Wait {
        /// How long to wait, in microseconds.
        duration_us: i64,
    },
}

/// Decides what to do with a frame at `frame_pts_us` given the current
/// `clock_us`, using `config`'s late-drop and early-wait thresholds.
///
/// `diff = frame_pts_us - clock_us`: positive means the frame is ahead of
/// the clock (too early), negative means it is behind (late). A frame more
/// than `late_frame_drop_threshold_us` behind is dropped; one within
/// `early_frame_wait_threshold_us` of the clock (behind or slightly ahead)
/// is displayed immediately rather than waited on.
pub fn sync_decision(frame_pts_us: i64, clock_us: i64, config: &PlayerConfig) -> SyncDecision {
    let diff = frame_pts_us - clock_us;
    if diff < -config.late_frame_drop_threshold_us {
        SyncDecision::Drop
    } else if diff <= -config.early_frame_wait_threshold_us {
        SyncDecision::Display
    } else {
        SyncDecision::Wait { duration_us: diff }
    }
}
