//! # player_core Component
//!
//! The top-level player state machine (§4.11): owns the content source, the
//! AVSync controller, and up to two decoder pipelines (audio, video) with
//! their renders, driven by a single message loop per player instance.
//!
//! # Overview
//!
//! - **Lifecycle**: [`PlayerBuilder`] constructs a player from its external
//!   collaborators; [`PlayerHandle`] is the resulting control surface.
//! - **Builder surface**: [`ContentSourceFactory`], [`DemuxerFactory`],
//!   [`CodecFactory`]
//! - **Per-track queueing**: [`PacketQueue`], [`QueueStatus`]
//! - **Flush/shutdown choreography**: [`FlushCommand`], [`FlushStatus`],
//!   [`TrackFlushState`]

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod command;
mod engine;
mod factory;
mod state;

pub use engine::{PlayerBuilder, PlayerHandle};
pub use factory::{CodecFactory, ContentSourceFactory, DemuxerFactory, NoopDemuxerFactory};
pub use mediacore_decode::{PacketQueue, QueueStatus};
pub use state::{FlushCommand, FlushStatus, TrackFlushState};
