//! Events emitted by the playback driver for the embedding front-end.

use cadence_core::RoomId;

/// User-visible playback lifecycle events.
///
/// The front-end owns formatting; the driver only reports what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A request was appended behind an active playback.
    Queued { room: RoomId, title: String },
    /// Playback of a resolved track started.
    NowPlaying { room: RoomId, title: String },
    /// First resolution failure of a burst; later retries stay silent.
    ResolveFailed { room: RoomId, message: String },
    /// Repeated failures hit the cap; the room was cleared and disconnected.
    Stopped { room: RoomId },
    /// The extraction service is blocking automated access; the room was
    /// cleared and disconnected.
    ServiceBlocked { room: RoomId },
    /// Queue exhausted with nothing to supply; the session ended.
    Disconnected { room: RoomId },
}
