//! # cadence-player
//!
//! The playback orchestration core: per-room queues, the track-to-track
//! state machine, multi-variant source resolution, the autoplay and radio
//! supply strategies, and the bounded failure-escalation policy.

pub mod autoplay;
pub mod driver;
pub mod events;
pub mod failure;
pub mod radio;
pub mod resolver;
pub mod rooms;

#[cfg(test)]
mod test_util;

pub use driver::Player;
pub use events::PlayerEvent;
pub use failure::{Verdict, MAX_FAILURES};
pub use radio::{RadioPoolEntry, RadioStatus};
pub use resolver::Resolver;
pub use rooms::{Phase, Room, RoomState, RoomStore};
