//! Autoplay supply strategy: similarity-based suggestion from the last
//! played title.

use cadence_core::{NowPlaying, TrackRef, TrackSource};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use regex::Regex;
use tracing::{debug, warn};

/// Search results considered per suggestion.
const SEARCH_LIMIT: usize = 5;

#[allow(clippy::unwrap_used)] // patterns are compile-time constants
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[{][^)\]}]*[)\]}]").unwrap());

#[allow(clippy::unwrap_used)]
static FEATURING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:ft\.?|feat\.?|featuring)\b.*$").unwrap());

#[allow(clippy::unwrap_used)]
static CHANNEL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s*-\s*topic\s*$|vevo\b)").unwrap());

#[allow(clippy::unwrap_used)]
static NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:official\s+(?:music\s+)?video|official\s+audio|lyric\s+video|lyrics|visuali[sz]er|remaster(?:ed)?)\b",
    )
    .unwrap()
});

#[allow(clippy::unwrap_used)]
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

#[allow(clippy::unwrap_used)]
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Derive a search query from a played title by stripping noise tokens.
///
/// Returns `None` when nothing usable survives cleaning.
pub(crate) fn derive_query(title: &str) -> Option<String> {
    let lowered = title.to_lowercase();
    let cleaned = BRACKETED.replace_all(&lowered, " ");
    let cleaned = FEATURING.replace_all(&cleaned, " ");
    let cleaned = CHANNEL_SUFFIX.replace_all(&cleaned, " ");
    let cleaned = NOISE.replace_all(&cleaned, " ");
    let cleaned = PUNCTUATION.replace_all(&cleaned, " ");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim().to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Propose one more track after the last played one.
///
/// Produces nothing when the cleaned query is empty, the search fails, or
/// every candidate is the track that just played.
pub(crate) async fn propose(
    source: &dyn TrackSource,
    rng: &Mutex<StdRng>,
    last: &NowPlaying,
) -> Option<TrackRef> {
    let query = derive_query(&last.title)?;

    let results = match source.search(&query, SEARCH_LIMIT).await {
        Ok(results) => results,
        Err(e) => {
            warn!("Autoplay search for \"{query}\" failed: {e}");
            return None;
        }
    };

    let candidates: Vec<_> = results
        .into_iter()
        .filter(|hit| hit.id != last.source_id)
        .collect();

    let choice = {
        let mut rng = rng.lock();
        candidates.choose(&mut *rng).cloned()
    }?;

    debug!("Autoplay picked \"{}\" from \"{query}\"", choice.title);
    Some(TrackRef::Url(choice.watch_url()))
}
