//! Compressed media packets as produced by the content source / demuxer.

use crate::track::TrackType;

/// Flags carried alongside a compressed packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// This packet starts a new keyframe / sync point.
    pub keyframe: bool,
    /// This packet is the last one for its track.
    pub end_of_stream: bool,
    /// Playback is discontinuous at this packet (e.g. after a seek).
    pub discontinuity: bool,
}

/// An immutable-after-queue buffer of compressed bytes for a single track.
///
/// Owned by the [`crate::TrackType`]'s packet queue until a decoder dequeues
/// it; a packet is never duplicated into two owners at once.
#[derive(Debug, Clone)]
pub struct MediaPacket {
    /// Which track this packet belongs to.
    pub track_type: TrackType,
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    /// Duration of this packet in microseconds, if known.
    pub duration_us: Option<i64>,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Compressed payload bytes.
    pub payload: Vec<u8>,
    /// Set when this packet carries a new format (in-band format change).
    pub format_change: bool,
}

impl MediaPacket {
    /// Creates a new packet with no flags set and no format change.
    pub fn new(track_type: TrackType, pts_us: i64, payload: Vec<u8>) -> Self {
        Self {
            track_type,
            pts_us,
            duration_us: None,
            flags: PacketFlags::default(),
            payload,
            format_change: false,
        }
    }

    /// Creates an end-of-stream marker packet for `track_type`.
    pub fn eos(track_type: TrackType) -> Self {
        Self {
            track_type,
            pts_us: 0,
            duration_us: None,
            flags: PacketFlags {
                end_of_stream: true,
                ..Default::default()
            },
            payload: Vec::new(),
            format_change: false,
        }
    }

    /// Size of the compressed payload in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
