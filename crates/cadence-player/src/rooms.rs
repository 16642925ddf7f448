//! Room state store: one mutable record per voice room.

use std::collections::VecDeque;
use std::sync::Arc;

use cadence_core::{NowPlaying, RoomId, TrackRef};
use cadence_voice::{PlaybackHandle, VoiceConnection};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::radio::RadioState;

/// Driver-visible phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Resolving,
    Playing,
}

/// Process-scoped store of room records. Rooms are created on first
/// reference and live until process shutdown.
#[derive(Default)]
pub struct RoomStore {
    rooms: DashMap<RoomId, Arc<Room>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a room, allocating its record on first reference.
    pub fn get_or_create(&self, id: RoomId) -> Arc<Room> {
        self.rooms
            .entry(id)
            .or_insert_with(|| Arc::new(Room::default()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// One room's record: its mutable state plus the lock serializing
/// orchestration steps.
#[derive(Default)]
pub struct Room {
    /// Mutable state. Held only for short synchronous sections, never across
    /// an await.
    pub state: Mutex<RoomState>,
    /// Step lock: at most one orchestration step runs per room. A second
    /// trigger waits here instead of interleaving queue pops.
    pub step: tokio::sync::Mutex<()>,
}

/// Mutable per-room playback state.
#[derive(Default)]
pub struct RoomState {
    /// Pending track references, FIFO.
    pub queue: VecDeque<TrackRef>,
    /// Last successfully resolved track.
    pub current: Option<NowPlaying>,
    /// Autoplay supply enabled.
    pub autoplay: bool,
    /// Radio supply state.
    pub radio: RadioState,
    /// Consecutive resolution failures. Reset to zero on any success.
    pub failure_count: u32,
    /// Driver phase.
    pub phase: Phase,
    /// Bumped by stop-and-clear; a step holding a stale value discards its
    /// resolution result instead of starting playback.
    pub generation: u64,
    /// Live voice connection, when joined.
    pub connection: Option<Arc<dyn VoiceConnection>>,
    /// Handle of the active playback, when playing.
    pub playback: Option<PlaybackHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_room() {
        let store = RoomStore::new();
        let a = store.get_or_create(RoomId(1));
        let b = store.get_or_create(RoomId(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rooms_are_independent() {
        let store = RoomStore::new();
        let a = store.get_or_create(RoomId(1));
        let b = store.get_or_create(RoomId(2));

        a.state.lock().failure_count = 2;
        assert_eq!(b.state.lock().failure_count, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_new_room_defaults() {
        let room = Room::default();
        let state = room.state.lock();
        assert!(state.queue.is_empty());
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.autoplay);
        assert!(!state.radio.enabled);
        assert!(state.current.is_none());
    }
}
