//! Seek modes and the content source's capability flag bitset (§6).

/// Seek mode, forwarded verbatim to the content source.
///
/// `NonBlocking` is carried as a bit rather than a variant because the
/// original interface defines it as an orthogonal modifier, not a distinct
/// seek target; this core does not branch on it beyond passing it through
/// (see the Open Questions in `SPEC_FULL.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekMode {
    /// Which sync point to target.
    pub target: SeekTarget,
    /// Whether the source should avoid blocking while honoring the seek.
    pub non_blocking: bool,
}

impl SeekMode {
    /// Shorthand for the common case: a blocking seek to the given target.
    pub fn new(target: SeekTarget) -> Self {
        Self {
            target,
            non_blocking: false,
        }
    }
}

/// The sync-point target of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    /// Seek to the sync point at or before the target.
    PreviousSync,
    /// Seek to the sync point at or after the target.
    NextSync,
    /// Seek to whichever sync point is closest.
    ClosestSync,
    /// Seek to the closest frame, not just the closest sync point.
    Closest,
    /// Seek by frame index rather than timestamp.
    FrameIndex,
}

/// Capability flags a content source reports about itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFlags(u32);

impl SourceFlags {
    /// The source can be paused.
    pub const CAN_PAUSE: u32 = 1;
    /// The source can seek backward.
    pub const CAN_SEEK_BACKWARD: u32 = 2;
    /// The source can seek forward.
    pub const CAN_SEEK_FORWARD: u32 = 4;
    /// The source can seek at all.
    pub const CAN_SEEK: u32 = 8;
    /// The source's duration can change during playback (e.g. live).
    pub const DYNAMIC_DURATION: u32 = 16;
    /// The source requires a secure decode path.
    pub const SECURE: u32 = 32;
    /// The source is DRM-protected.
    pub const PROTECTED: u32 = 64;

    /// Builds a flag set from a raw bitmask.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns `true` if `flag` is set.
    pub const fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Raw bitmask.
    pub const fn bits(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits_round_trip() {
        let flags = SourceFlags::from_bits(SourceFlags::CAN_PAUSE | SourceFlags::CAN_SEEK);
        assert!(flags.has(SourceFlags::CAN_PAUSE));
        assert!(flags.has(SourceFlags::CAN_SEEK));
        assert!(!flags.has(SourceFlags::SECURE));
    }
}
