//! # player_sync Component
//!
//! The AV-sync controller: a lock-protected master clock shared by the
//! audio and video renders, plus the decision each render makes about
//! whether to display, drop, or wait on a frame relative to it.
//!
//! Grounded on the original's `avsync_controller.h`: an anchor
//! `(media_pts, sys_time)` pair extrapolated forward by a playback rate,
//! clamped to a monotonically rising `max_media_time`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod clock;
mod controller;
mod decision;

pub use clock::{ClockSource, SystemClockSource};
pub use controller::{AVSyncController, ClockType};
pub use decision::{sync_decision, SyncDecision};
