//! Packet Queue (§4.2): a bounded per-track FIFO with a format-carrying
//! header. No internal scheduling — blocking is the caller's concern.
//!
//! Lives in this crate (rather than `player_core`, which depends on it)
//! since the decoders that actually need one (`NormalDecoder`,
//! `TunnelDecoder`) cannot depend on their own downstream crate.

use std::collections::VecDeque;

use mediacore_types::{MediaFormat, MediaPacket};

/// Whether a queue can accept more packets right now, and why not if it
/// can't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// The queue has room.
    Available,
    /// The queue is at its bound.
    Full,
}

/// A bounded FIFO of compressed packets for a single track, plus the
/// format currently associated with it.
pub struct PacketQueue {
    packets: VecDeque<MediaPacket>,
    bound: usize,
    format: Option<MediaFormat>,
}

impl PacketQueue {
    /// Creates an empty queue bounded at `bound` packets.
    pub fn new(bound: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            bound,
            format: None,
        }
    }

    /// Appends `packet` if there is room; returns `false` if the queue was
    /// full and the packet was rejected.
    pub fn queue(&mut self, packet: MediaPacket) -> bool {
        if self.packets.len() >= self.bound {
            return false;
        }
        self.packets.push_back(packet);
        true
    }

    /// Pops the oldest packet, if any.
    pub fn dequeue(&mut self) -> Option<MediaPacket> {
        self.packets.pop_front()
    }

    /// Reports whether the queue currently has a packet ready.
    pub fn has_buffer_available(&self) -> (bool, QueueStatus) {
        let status = if self.packets.len() >= self.bound {
            QueueStatus::Full
        } else {
            QueueStatus::Available
        };
        (!self.packets.is_empty(), status)
    }

    /// Drops all queued packets.
    pub fn clear(&mut self) {
        self.packets.clear();
    }

    /// Associates `format` with this queue's track.
    pub fn set_format(&mut self, format: MediaFormat) {
        self.format = Some(format);
    }

    /// The format currently associated with this queue's track, if known.
    pub fn format(&self) -> Option<&MediaFormat> {
        self.format.as_ref()
    }

    /// Number of packets currently queued.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the queue holds no packets.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacore_types::TrackType;

    #[test]
    fn queue_then_dequeue_preserves_packet_identity() {
        let mut queue = PacketQueue::new(4);
        let packet = MediaPacket::new(TrackType::Audio, 1_000, vec![1, 2, 3]);
        assert!(queue.queue(packet.clone()));
        let dequeued = queue.dequeue().unwrap();
        assert_eq!(dequeued.pts_us, packet.pts_us);
        assert_eq!(dequeued.payload, packet.payload);
    }

    #[test]
    fn rejects_once_full() {
        let mut queue = PacketQueue::new(2);
        assert!(queue.queue(MediaPacket::new(TrackType::Audio, 0, vec![])));
        assert!(queue.queue(MediaPacket::new(TrackType::Audio, 1, vec![])));
        assert!(!queue.queue(MediaPacket::new(TrackType::Audio, 2, vec![])));
        assert_eq!(queue.has_buffer_available().1, QueueStatus::Full);
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut queue = PacketQueue::new(4);
        queue.queue(MediaPacket::new(TrackType::Audio, 0, vec![]));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.has_buffer_available().0, false);
    }
}
