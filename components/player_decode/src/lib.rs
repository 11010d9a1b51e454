//! # player_decode Component
//!
//! The four decoder pipelines (§4.7-§4.10) and the factory that selects
//! between them (§4.11). Each decoder is a message-driven component
//! running on its own `tokio` task, matching the concurrency model in
//! §5: one loop per decoder, with codec callbacks folded back into the
//! same loop as ordinary messages.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod base;
mod normal;
mod packet_queue;
mod passthrough;
mod select;
mod subtitle;
mod tunnel;

pub use base::{spawn_decoder_loop, DecoderActor, DecoderCommand, DecoderEvent, DecoderHandle};
pub use normal::NormalDecoder;
pub use packet_queue::{PacketQueue, QueueStatus};
pub use passthrough::PassthroughDecoder;
pub use select::{select_decoder_kind, DecoderKind};
pub use subtitle::SubtitleDecoder;
pub use tunnel::TunnelDecoder;
