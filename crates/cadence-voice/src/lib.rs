//! # cadence-voice
//!
//! Voice-session collaborator seam for Cadence: the transport traits the
//! playback driver drives, and the ffmpeg subprocess stream a concrete
//! transport uses to turn a resolved stream URL into PCM audio.

pub mod transcode;
pub mod transport;

pub use transcode::{PcmChunk, TranscodeStream};
pub use transport::{PlaybackHandle, VoiceConnection, VoiceTransport};
