//! Track type identity shared by packets, frames, and decoders.

/// The kind of elementary stream a packet, frame, or decoder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    /// Audio track.
    Audio,
    /// Video track.
    Video,
    /// Subtitle track (SRT/ASS/VTT or an opaque blob).
    Subtitle,
    /// Timed text track (closed captions and similar).
    TimedText,
}

impl TrackType {
    /// Returns `true` for tracks that are rendered through an audio/video
    /// scheduler rather than forwarded as-is to an external sink.
    pub fn is_av(self) -> bool {
        matches!(self, TrackType::Audio | TrackType::Video)
    }
}
