//! # cadence-core
//!
//! Core types, traits, and error handling for the Cadence voice playback
//! orchestrator.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{matches_block_signature, Error, HttpError, Result};
pub use traits::TrackSource;
pub use types::*;
