//! Builder-surface factories (§6): the caller-supplied collaborators a
//! player is constructed from.

use std::sync::Arc;

use mediacore_types::{Codec, ContentSource, MediaFormat, PlayerResult, TrackType};

/// Produces a [`ContentSource`] for a data source description. Kept
/// intentionally opaque (a `String` URI) since container/protocol parsing
/// is out of scope for this core.
pub trait ContentSourceFactory: Send + Sync {
    /// Creates a source for `uri`.
    fn create(&self, uri: &str) -> PlayerResult<Arc<dyn ContentSource>>;
}

/// Produces demuxer instrumentation ahead of a [`ContentSource`], named in
/// the builder surface alongside the source factory. This core does not
/// itself demux; a caller whose `ContentSourceFactory` already demuxes can
/// supply a no-op implementation.
pub trait DemuxerFactory: Send + Sync {
    /// Prepares demuxing for `uri` before the content source is created.
    /// The default implementation does nothing.
    fn prepare(&self, _uri: &str) -> PlayerResult<()> {
        Ok(())
    }
}

/// Produces a [`Codec`] instance for a given track format.
pub trait CodecFactory: Send + Sync {
    /// Creates a codec capable of decoding `format`, or
    /// [`mediacore_types::PlayerError::WouldBlock`] if the factory needs a
    /// retry (e.g. a device-backed codec that is momentarily busy).
    fn create(&self, track_type: TrackType, format: &MediaFormat) -> PlayerResult<Box<dyn Codec>>;
}

/// The default [`DemuxerFactory`] for callers whose `ContentSourceFactory`
/// already demuxes on its own.
pub struct NoopDemuxerFactory;

impl DemuxerFactory for NoopDemuxerFactory {}
