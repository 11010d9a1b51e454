//! # player_render Component
//!
//! The render scheduler (§4.3) and its three specializations: the audio
//! render (§4.4), the video render (§4.5), and the subtitle render
//! (§4.10, rendering half). Each owns a bounded frame queue and paces
//! delivery against the master clock (or, for audio, against its own
//! device-buffer state).

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod audio;
mod scheduler;
mod subtitle;
mod video;

pub use audio::AudioRender;
pub use scheduler::{RenderDelegate, RenderScheduler, SchedulerMode};
pub use subtitle::SubtitleRender;
pub use video::VideoRender;
