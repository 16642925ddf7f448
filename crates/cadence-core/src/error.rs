//! Error types for Cadence.

use thiserror::Error;

/// Result type alias using Cadence's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cadence.
#[derive(Error, Debug)]
pub enum Error {
    // Request errors, reported straight back to the user
    #[error("you are not in a joinable voice channel")]
    NoVoiceChannel,

    #[error("could not join the voice channel: {0}")]
    ConnectFailure(String),

    #[error("no results found for \"{0}\"")]
    NoSearchResults(String),

    // Resolution failures, subject to the failure policy
    #[error("no playable audio stream for {0}")]
    NoPlayableAudio(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse service response: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("playback transport error: {0}")]
    Transport(String),

    // Terminal: the extraction service is refusing automated access
    #[error("the extraction service is blocking automated access: {0}")]
    ServiceBlock(String),
}

/// HTTP-specific errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed with status {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timeout")]
    Timeout,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Returns true if the extraction service is actively refusing automated
    /// access. These failures bypass the retry counter entirely.
    pub const fn is_service_block(&self) -> bool {
        matches!(self, Self::ServiceBlock(_))
    }

    /// Returns true if this error is a resolution failure that increments the
    /// room's consecutive-failure counter.
    pub const fn counts_toward_failure(&self) -> bool {
        matches!(
            self,
            Self::NoPlayableAudio(_)
                | Self::Extraction(_)
                | Self::Http(_)
                | Self::Network(_)
                | Self::Parse(_)
                | Self::Json(_)
                | Self::Io(_)
                | Self::Transport(_)
        )
    }

    /// Returns true if the HTTP layer may transparently retry this error.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http(HttpError::ConnectionFailed(_) | HttpError::Timeout)
        )
    }
}

/// Error-text signatures the extraction service emits when it is refusing
/// automated access.
const BLOCK_SIGNATURES: &[&str] = &[
    "sign in to confirm",
    "not a bot",
    "login_required",
    "captcha",
];

/// Check service error text against the known login/bot-check signatures.
pub fn matches_block_signature(text: &str) -> bool {
    let lower = text.to_lowercase();
    BLOCK_SIGNATURES.iter().any(|sig| lower.contains(sig))
}
