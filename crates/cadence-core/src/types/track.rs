//! Track references and search results.

use serde::{Deserialize, Serialize};
use url::Url;

const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

/// An unresolved pointer to a track: either a direct source URL or free-text
/// to search for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackRef {
    /// A direct stream-source URL in canonical watch form.
    Url(String),
    /// A free-text search query.
    Query(String),
}

impl TrackRef {
    /// Build a reference from raw user input. Anything that is not an
    /// absolute URL is treated as a search query.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http") {
            Self::Url(normalize_watch_url(trimmed))
        } else {
            Self::Query(trimmed.to_string())
        }
    }

    /// Build a reference from a bare source identifier.
    pub fn from_source_id(id: &str) -> Self {
        Self::Url(normalize_watch_url(id))
    }

    /// The display form used in messages before resolution.
    pub fn display(&self) -> &str {
        match self {
            Self::Url(s) | Self::Query(s) => s,
        }
    }
}

/// Normalize a value into an absolute watch URL. Absolute URLs pass through
/// untouched, so applying this twice is a no-op.
pub fn normalize_watch_url(value: &str) -> String {
    if value.starts_with("http") {
        value.to_string()
    } else {
        format!("{WATCH_BASE}{value}")
    }
}

/// Pull the source identifier out of a watch URL.
///
/// Understands `watch?v=` URLs, `youtu.be` short links, and bare identifiers.
pub fn video_id_from_url(value: &str) -> Option<String> {
    if !value.starts_with("http") {
        return (!value.is_empty()).then(|| value.to_string());
    }

    let url = Url::parse(value).ok()?;
    if url.host_str().is_some_and(|h| h.ends_with("youtu.be")) {
        let id = url.path().trim_start_matches('/');
        return (!id.is_empty()).then(|| id.to_string());
    }

    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
}

/// One row of a search result, in the order the service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Source identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Canonical page URL, when the service provided one.
    pub webpage_url: Option<String>,
}

impl TrackSummary {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            webpage_url: None,
        }
    }

    #[must_use]
    pub fn with_webpage_url(mut self, url: impl Into<String>) -> Self {
        self.webpage_url = Some(url.into());
        self
    }

    /// The URL to enqueue for this result.
    pub fn watch_url(&self) -> String {
        self.webpage_url
            .clone()
            .unwrap_or_else(|| normalize_watch_url(&self.id))
    }
}

/// Metadata of the last successfully resolved track in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    /// Display title.
    pub title: String,
    /// Source identifier.
    pub source_id: String,
}
