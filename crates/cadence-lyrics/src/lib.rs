//! Lyrics lookup for Cadence.
//!
//! Free-text search against the LRCLIB API; the first hit with usable plain
//! lyrics wins.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const API_BASE_URL: &str = "https://lrclib.net/api";

/// Errors from the lyrics collaborator.
#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("no lyrics found for \"{0}\"")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("lyrics API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse lyrics response: {0}")]
    Parse(String),
}

/// Plain-text lyrics for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lyrics {
    /// Track title as the lyrics provider knows it.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Full lyrics text.
    pub text: String,
}

/// One row of an LRCLIB search response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    track_name: Option<String>,
    artist_name: Option<String>,
    #[serde(default)]
    instrumental: bool,
    plain_lyrics: Option<String>,
}

/// Lyrics client for the LRCLIB search API.
#[derive(Clone)]
pub struct LyricsClient {
    client: Client,
}

impl Default for LyricsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LyricsClient {
    /// Create a new lyrics client.
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Cadence/1.0")
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Look up lyrics by free-text title.
    ///
    /// # Arguments
    /// * `title` - Anything identifying the track, e.g. "artist - song"
    pub async fn lookup(&self, title: &str) -> Result<Lyrics, LyricsError> {
        info!("Looking up lyrics for: {title}");

        let url = format!("{API_BASE_URL}/search?q={}", urlencoding::encode(title));
        debug!("Requesting: {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LyricsError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LyricsError::Api { status, message });
        }

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| LyricsError::Parse(e.to_string()))?;

        first_usable(hits).ok_or_else(|| LyricsError::NotFound(title.to_string()))
    }
}

/// The first hit carrying real lyrics text, in provider order.
fn first_usable(hits: Vec<SearchHit>) -> Option<Lyrics> {
    hits.into_iter().find_map(|hit| {
        if hit.instrumental {
            return None;
        }
        let text = hit.plain_lyrics.filter(|t| !t.trim().is_empty())?;
        Some(Lyrics {
            title: hit.track_name.unwrap_or_default(),
            artist: hit.artist_name.unwrap_or_default(),
            text,
        })
    })
}

/// URL encoding helper.
mod urlencoding {
    use std::fmt::Write;

    pub fn encode(s: &str) -> String {
        let mut result = String::with_capacity(s.len() * 3);
        for c in s.chars() {
            match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                    result.push(c);
                }
                ' ' => result.push_str("%20"),
                _ => {
                    for b in c.to_string().bytes() {
                        let _ = write!(result, "%{b:02X}");
                    }
                }
            }
        }
        result
    }
}
