//! Core domain types for Cadence.

pub mod format;
pub mod ids;
pub mod track;

pub use format::{ExtractedInfo, ResolvedTrack, SourceFormat, SourceVariant, TransportHeaders};
pub use ids::{ChannelId, RoomId};
pub use track::{normalize_watch_url, video_id_from_url, NowPlaying, TrackRef, TrackSummary};
