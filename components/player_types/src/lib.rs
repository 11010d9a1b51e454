//! # player_types Component
//!
//! Common types, enums, and traits shared by every media-core component:
//! packets, frames, formats, errors, and the trait seams the core uses to
//! talk to the content source, codec, audio device, and video sink.
//!
//! # Overview
//!
//! - **Data model**: [`MediaPacket`], [`MediaFrame`], [`MediaFormat`]
//! - **Errors**: [`PlayerError`], [`PlayerResult`]
//! - **Track identity**: [`TrackType`]
//! - **Seek / source flags**: [`SeekMode`], [`SourceFlags`]
//! - **External collaborator traits**: [`ContentSource`], [`Codec`],
//!   [`CodecCallback`], [`AudioDevice`], [`AudioTrack`], [`VideoRenderSink`],
//!   [`SubtitleSink`], [`PlayerListener`]
//! - **Configuration**: [`PlayerConfig`]

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod config;
mod error;
mod format;
mod frame;
mod packet;
mod seek;
mod track;
mod traits;

pub use config::PlayerConfig;
pub use error::{PlayerError, PlayerResult};
pub use format::{
    AudioSampleFormat, ChannelLayout, MediaFormat, OffloadInfo, PixelFormat,
    is_passthrough_capable_mime, is_subtitle_mime, is_tunnel_capable_mime,
};
pub use frame::{AudioFrameInfo, MediaFrame, SubtitleFrameInfo, VideoFrameInfo};
pub use packet::{MediaPacket, PacketFlags};
pub use seek::{SeekMode, SourceFlags};
pub use track::TrackType;
pub use traits::{
    AudioConfig, AudioDevice, AudioTrack, Codec, CodecBuffer, CodecCallback, CodecConfig,
    ContentSource, FrameSink, PlayerListener, SourceError, SourceNotify, SubtitleSink,
    VideoRenderSink,
};
