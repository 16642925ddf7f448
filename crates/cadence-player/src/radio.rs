//! Radio supply strategy: a themed pool of tracks refilled from a seed
//! search.

use std::collections::{HashSet, VecDeque};

use cadence_core::TrackSource;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::rooms::Room;

/// Played identifiers remembered per room; oldest evicted first.
pub const HISTORY_LIMIT: usize = 20;

/// Results fetched per pool refill.
pub const REFILL_COUNT: usize = 12;

/// Seeds used when the room has not configured one.
pub const DEFAULT_SEEDS: &[&str] = &[
    "lofi hip hop mix",
    "classic rock hits",
    "synthwave retro mix",
    "jazz standards",
    "90s alternative rock",
    "latin pop hits",
    "deep house mix",
    "acoustic covers",
];

/// Per-room radio state.
#[derive(Debug, Clone, Default)]
pub struct RadioState {
    /// Radio supply enabled.
    pub enabled: bool,
    /// Configured seed phrase, or `None` to draw from the defaults.
    pub seed: Option<String>,
    /// Candidate tracks awaiting play.
    pub pool: Vec<RadioPoolEntry>,
    /// Recently supplied identifiers, bounded by [`HISTORY_LIMIT`].
    pub recent: VecDeque<String>,
}

impl RadioState {
    /// Record a supplied identifier, evicting the oldest past the bound.
    pub fn remember(&mut self, source_id: String) {
        self.recent.push_back(source_id);
        while self.recent.len() > HISTORY_LIMIT {
            self.recent.pop_front();
        }
    }

    /// Whether an identifier may enter the pool.
    pub fn admits(&self, source_id: &str) -> bool {
        !self.recent.iter().any(|id| id == source_id)
    }
}

/// One candidate track in the radio pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPoolEntry {
    pub source_id: String,
    pub url: String,
    pub title: String,
}

/// Answer to the radio-status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioStatus {
    pub enabled: bool,
    pub seed: Option<String>,
    pub pool_size: usize,
}

/// Supply the next radio track, refilling the pool first when it is empty.
///
/// Produces nothing when a refill yields zero usable entries.
pub(crate) async fn next_track(
    source: &dyn TrackSource,
    rng: &Mutex<StdRng>,
    room: &Room,
) -> Option<RadioPoolEntry> {
    let needs_refill = room.state.lock().radio.pool.is_empty();
    if needs_refill {
        refill(source, rng, room).await;
    }

    let mut state = room.state.lock();
    let entry = state.radio.pool.pop()?;
    state.radio.remember(entry.source_id.clone());
    Some(entry)
}

async fn refill(source: &dyn TrackSource, rng: &Mutex<StdRng>, room: &Room) {
    let seed = room.state.lock().radio.seed.clone().unwrap_or_else(|| {
        let mut rng = rng.lock();
        DEFAULT_SEEDS
            .choose(&mut *rng)
            .copied()
            .unwrap_or(DEFAULT_SEEDS[0])
            .to_string()
    });

    let results = match source.search(&seed, REFILL_COUNT).await {
        Ok(results) => results,
        Err(e) => {
            warn!("Radio refill search for \"{seed}\" failed: {e}");
            return;
        }
    };

    let recent = room.state.lock().radio.recent.clone();
    let mut seen = HashSet::new();
    let mut fresh: Vec<RadioPoolEntry> = results
        .into_iter()
        .filter(|hit| !recent.contains(&hit.id) && seen.insert(hit.id.clone()))
        .map(|hit| RadioPoolEntry {
            url: hit.watch_url(),
            title: hit.title,
            source_id: hit.id,
        })
        .collect();

    fresh.shuffle(&mut *rng.lock());
    debug!("Radio refill from \"{seed}\" kept {} entries", fresh.len());
    room.state.lock().radio.pool = fresh;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_util::FakeSource;
    use cadence_core::TrackSummary;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn seeded(seed: u64) -> Mutex<StdRng> {
        Mutex::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut radio = RadioState::default();
        for i in 0..25 {
            radio.remember(format!("id{i}"));
        }
        assert_eq!(radio.recent.len(), HISTORY_LIMIT);
        assert_eq!(radio.recent.front().map(String::as_str), Some("id5"));
        assert_eq!(radio.recent.back().map(String::as_str), Some("id24"));
        assert!(!radio.admits("id10"));
        assert!(radio.admits("id4"));
    }

    #[tokio::test]
    async fn test_refill_then_supply() {
        let source = Arc::new(FakeSource::new());
        source.push_search(Ok((0..12)
            .map(|i| TrackSummary::new(format!("r{i}"), format!("Radio {i}")))
            .collect()));

        let room = Room::default();
        room.state.lock().radio.seed = Some("jazz standards".into());
        let rng = seeded(3);

        let entry = next_track(source.as_ref(), &rng, &room).await.unwrap();

        let state = room.state.lock();
        assert_eq!(state.radio.pool.len(), 11);
        assert_eq!(state.radio.recent.len(), 1);
        assert_eq!(state.radio.recent.front(), Some(&entry.source_id));
        assert!(state.radio.pool.iter().all(|e| e.source_id != entry.source_id));
        assert_eq!(source.searches.lock().as_slice(), ["jazz standards"]);
    }

    #[tokio::test]
    async fn test_refill_drops_recent_identifiers() {
        let source = Arc::new(FakeSource::new());
        source.push_search(Ok(vec![
            TrackSummary::new("old1", "Old One"),
            TrackSummary::new("new1", "New One"),
            TrackSummary::new("old2", "Old Two"),
        ]));

        let room = Room::default();
        {
            let mut state = room.state.lock();
            state.radio.seed = Some("seed".into());
            state.radio.remember("old1".into());
            state.radio.remember("old2".into());
        }
        let rng = seeded(7);

        let entry = next_track(source.as_ref(), &rng, &room).await.unwrap();
        assert_eq!(entry.source_id, "new1");
        assert!(room.state.lock().radio.pool.is_empty());

        let state = room.state.lock();
        for id in &state.radio.recent {
            assert!(state.radio.pool.iter().all(|e| &e.source_id != id));
        }
    }

    #[tokio::test]
    async fn test_default_seed_drawn_when_unconfigured() {
        let source = Arc::new(FakeSource::new());
        source.push_search(Ok(vec![TrackSummary::new("x", "X")]));

        let room = Room::default();
        let rng = seeded(11);

        let entry = next_track(source.as_ref(), &rng, &room).await;
        assert!(entry.is_some());

        let searches = source.searches.lock();
        assert_eq!(searches.len(), 1);
        assert!(DEFAULT_SEEDS.contains(&searches[0].as_str()));
    }

    #[tokio::test]
    async fn test_nothing_when_refill_yields_no_usable_entries() {
        let source = Arc::new(FakeSource::new());
        source.push_search(Ok(vec![TrackSummary::new("seen", "Seen")]));

        let room = Room::default();
        {
            let mut state = room.state.lock();
            state.radio.seed = Some("seed".into());
            state.radio.remember("seen".into());
        }
        let rng = seeded(2);

        assert!(next_track(source.as_ref(), &rng, &room).await.is_none());
    }

    #[tokio::test]
    async fn test_refill_deduplicates_within_one_batch() {
        let source = Arc::new(FakeSource::new());
        source.push_search(Ok(vec![
            TrackSummary::new("dup", "Dup A"),
            TrackSummary::new("dup", "Dup B"),
            TrackSummary::new("solo", "Solo"),
        ]));

        let room = Room::default();
        room.state.lock().radio.seed = Some("seed".into());
        let rng = seeded(5);

        let first = next_track(source.as_ref(), &rng, &room).await.unwrap();
        let state = room.state.lock();
        assert_eq!(state.radio.pool.len(), 1);
        assert_ne!(state.radio.pool[0].source_id, first.source_id);
    }
}
