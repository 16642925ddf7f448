//! Playback driver: the per-room orchestration state machine.
//!
//! Every continuation decision funnels through [`Player::step`]: popping the
//! queue, consulting the supply strategies, and escalating failures. A step
//! runs under the room's step lock, so triggers racing for the same room
//! wait or coalesce instead of interleaving queue pops.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::{ChannelId, Error, NowPlaying, Result, RoomId, TrackRef, TrackSource};
use cadence_voice::{PlaybackHandle, VoiceConnection, VoiceTransport};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::autoplay;
use crate::events::PlayerEvent;
use crate::failure::{self, Verdict};
use crate::radio::{self, RadioStatus};
use crate::resolver::Resolver;
use crate::rooms::{Phase, Room, RoomStore};

/// Bounded wait for joining a voice channel.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The playback orchestrator. Cheap to clone; all state lives behind `Arc`s.
#[derive(Clone)]
pub struct Player {
    rooms: Arc<RoomStore>,
    resolver: Resolver,
    source: Arc<dyn TrackSource>,
    voice: Arc<dyn VoiceTransport>,
    events: mpsc::UnboundedSender<PlayerEvent>,
    rng: Arc<Mutex<StdRng>>,
}

impl Player {
    /// Create a player over the given collaborators, returning the event
    /// stream the front-end renders from.
    pub fn new(
        source: Arc<dyn TrackSource>,
        voice: Arc<dyn VoiceTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let player = Self {
            rooms: Arc::new(RoomStore::new()),
            resolver: Resolver::new(source.clone()),
            source,
            voice,
            events,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        };
        (player, event_rx)
    }

    /// Reseed the strategy RNG for deterministic selection.
    #[must_use]
    pub fn with_rng_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Handle a play request: resolve free text to a track reference,
    /// append it, and start the driver unless playback is already active.
    ///
    /// `channel` is required only when the room has no live voice
    /// connection.
    pub async fn enqueue_and_maybe_start(
        &self,
        room_id: RoomId,
        channel: Option<ChannelId>,
        input: &str,
    ) -> Result<()> {
        let room = self.rooms.get_or_create(room_id);
        self.ensure_connected(&room, room_id, channel).await?;

        let (track_ref, title) = match TrackRef::from_input(input) {
            TrackRef::Query(query) => {
                let results = self.source.search(&query, 1).await?;
                let hit = results
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::NoSearchResults(query.clone()))?;
                (TrackRef::Url(hit.watch_url()), hit.title)
            }
            url_ref @ TrackRef::Url(_) => {
                let title = url_ref.display().to_string();
                (url_ref, title)
            }
        };

        let already_playing = {
            let mut state = room.state.lock();
            state.queue.push_back(track_ref);
            state.phase == Phase::Playing && state.playback.is_some()
        };

        if already_playing {
            info!("Queued \"{title}\" in room {room_id}");
            self.emit(PlayerEvent::Queued {
                room: room_id,
                title,
            });
            return Ok(());
        }

        self.step(room_id).await;
        Ok(())
    }

    /// Stop the active playback; the finished notification advances the
    /// queue. Natural end and skip are indistinguishable downstream.
    pub async fn skip(&self, room_id: RoomId) {
        let room = self.rooms.get_or_create(room_id);
        let target = {
            let state = room.state.lock();
            state.connection.clone().zip(state.playback.clone())
        };
        if let Some((connection, handle)) = target {
            debug!("Skipping current track in room {room_id}");
            connection.stop(&handle).await;
        }
    }

    /// The radio-skip command behaves exactly like skip; the radio pool
    /// supplies the next track through the normal advance path.
    pub async fn radio_skip(&self, room_id: RoomId) {
        self.skip(room_id).await;
    }

    /// Clear the queue and leave the voice channel. An in-flight resolution
    /// observes the generation bump and discards its result.
    pub async fn stop_and_clear(&self, room_id: RoomId) {
        let room = self.rooms.get_or_create(room_id);
        let (connection, handle) = {
            let mut state = room.state.lock();
            state.queue.clear();
            state.generation += 1;
            state.phase = Phase::Idle;
            (state.connection.take(), state.playback.take())
        };
        if let Some(connection) = connection {
            if let Some(handle) = handle {
                connection.stop(&handle).await;
            }
            connection.disconnect().await;
        }
        info!("Stopped and cleared room {room_id}");
    }

    /// Toggle the autoplay supply strategy.
    pub fn set_autoplay(&self, room_id: RoomId, enabled: bool) {
        let room = self.rooms.get_or_create(room_id);
        room.state.lock().autoplay = enabled;
        info!("Autoplay {} in room {room_id}", on_off(enabled));
    }

    /// Toggle the radio supply strategy, optionally configuring its seed.
    pub fn set_radio(&self, room_id: RoomId, enabled: bool, seed: Option<String>) {
        let room = self.rooms.get_or_create(room_id);
        let mut state = room.state.lock();
        let radio = &mut state.radio;
        radio.enabled = enabled;
        if seed.is_some() && seed != radio.seed {
            // A new seed invalidates candidates gathered for the old one.
            radio.seed = seed;
            radio.pool.clear();
        }
        if !enabled {
            radio.pool.clear();
        }
        info!("Radio {} in room {room_id}", on_off(enabled));
    }

    /// Answer the radio-status command.
    pub fn radio_status(&self, room_id: RoomId) -> RadioStatus {
        let room = self.rooms.get_or_create(room_id);
        let state = room.state.lock();
        RadioStatus {
            enabled: state.radio.enabled,
            seed: state.radio.seed.clone(),
            pool_size: state.radio.pool.len(),
        }
    }

    async fn ensure_connected(
        &self,
        room: &Arc<Room>,
        room_id: RoomId,
        channel: Option<ChannelId>,
    ) -> Result<()> {
        let connected = {
            let state = room.state.lock();
            state.connection.as_ref().is_some_and(|c| c.is_active())
        };
        if connected {
            return Ok(());
        }

        let channel = channel.ok_or(Error::NoVoiceChannel)?;
        let connection = self
            .voice
            .connect(room_id, channel, CONNECT_TIMEOUT)
            .await?;
        room.state.lock().connection = Some(connection);
        info!("Joined channel {channel} in room {room_id}");
        Ok(())
    }

    /// One orchestration step: resolve queue items until playback starts,
    /// the supply strategies run dry, or the failure policy stops the room.
    async fn step(&self, room_id: RoomId) {
        let room = self.rooms.get_or_create(room_id);
        let _step = room.step.lock().await;

        {
            let mut state = room.state.lock();
            // A trigger that lands after another step already started
            // playback has nothing to do until the next finished event.
            if state.phase == Phase::Playing && state.playback.is_some() {
                return;
            }
            state.phase = Phase::Resolving;
        }

        loop {
            let popped = {
                let mut state = room.state.lock();
                let generation = state.generation;
                state.queue.pop_front().map(|track| (track, generation))
            };

            let Some((track_ref, generation)) = popped else {
                let connected = {
                    let state = room.state.lock();
                    state.connection.as_ref().is_some_and(|c| c.is_active())
                };
                if connected && self.try_supply(&room).await {
                    continue;
                }
                self.wind_down(&room, room_id).await;
                return;
            };

            debug!("Resolving {} in room {room_id}", track_ref.display());
            match self.resolver.resolve(&track_ref).await {
                Ok(resolved) => {
                    let connection = {
                        let mut state = room.state.lock();
                        if state.generation != generation {
                            debug!("Discarding stale resolution in room {room_id}");
                            state.phase = Phase::Idle;
                            return;
                        }
                        state.current = Some(NowPlaying {
                            title: resolved.title.clone(),
                            source_id: resolved.source_id.clone(),
                        });
                        state.failure_count = 0;
                        state.connection.clone()
                    };

                    let Some(connection) = connection else {
                        room.state.lock().phase = Phase::Idle;
                        return;
                    };

                    match connection
                        .start_stream(&resolved.stream_url, &resolved.headers)
                        .await
                    {
                        Ok(handle) => {
                            {
                                let mut state = room.state.lock();
                                state.phase = Phase::Playing;
                                state.playback = Some(handle.clone());
                            }
                            self.watch_playback(room_id, handle);
                            info!(
                                "Now playing \"{}\" in room {room_id} ({} variant)",
                                resolved.title,
                                resolved.variant.as_str()
                            );
                            self.emit(PlayerEvent::NowPlaying {
                                room: room_id,
                                title: resolved.title,
                            });
                            return;
                        }
                        Err(e) => {
                            if self.handle_failure(&room, room_id, generation, &e).await {
                                continue;
                            }
                            return;
                        }
                    }
                }
                Err(e) => {
                    if self.handle_failure(&room, room_id, generation, &e).await {
                        continue;
                    }
                    return;
                }
            }
        }
    }

    /// Ask the supply strategies for one more reference. Autoplay is
    /// consulted first, radio second.
    async fn try_supply(&self, room: &Arc<Room>) -> bool {
        let last = {
            let state = room.state.lock();
            if state.autoplay {
                state.current.clone()
            } else {
                None
            }
        };
        if let Some(last) = last {
            if let Some(track) = autoplay::propose(self.source.as_ref(), &self.rng, &last).await {
                debug!("Autoplay supplied {}", track.display());
                room.state.lock().queue.push_back(track);
                return true;
            }
        }

        let radio_enabled = room.state.lock().radio.enabled;
        if radio_enabled {
            if let Some(entry) = radio::next_track(self.source.as_ref(), &self.rng, room).await {
                debug!("Radio supplied \"{}\"", entry.title);
                room.state
                    .lock()
                    .queue
                    .push_back(TrackRef::Url(entry.url));
                return true;
            }
        }

        false
    }

    /// Apply the failure policy to a failed resolution. Returns true when
    /// the driver should loop back into resolving.
    async fn handle_failure(
        &self,
        room: &Arc<Room>,
        room_id: RoomId,
        generation: u64,
        error: &Error,
    ) -> bool {
        let count = {
            let mut state = room.state.lock();
            if state.generation != generation {
                state.phase = Phase::Idle;
                return false;
            }
            state.failure_count += 1;
            state.failure_count
        };

        warn!("Resolution failure {count} in room {room_id}: {error}");

        match failure::assess(error, count) {
            Verdict::Retry => {
                if count == 1 {
                    self.emit(PlayerEvent::ResolveFailed {
                        room: room_id,
                        message: error.to_string(),
                    });
                }
                true
            }
            Verdict::Stop => {
                self.shutdown(room).await;
                self.emit(PlayerEvent::Stopped { room: room_id });
                false
            }
            Verdict::FatalBlock => {
                self.shutdown(room).await;
                self.emit(PlayerEvent::ServiceBlocked { room: room_id });
                false
            }
        }
    }

    /// Terminal escalation: empty the queue and leave the channel.
    async fn shutdown(&self, room: &Arc<Room>) {
        let (connection, handle) = {
            let mut state = room.state.lock();
            state.queue.clear();
            state.phase = Phase::Idle;
            (state.connection.take(), state.playback.take())
        };
        if let Some(connection) = connection {
            if let Some(handle) = handle {
                connection.stop(&handle).await;
            }
            connection.disconnect().await;
        }
    }

    /// Queue exhausted with nothing supplied: leave the channel if one is
    /// still held.
    async fn wind_down(&self, room: &Arc<Room>, room_id: RoomId) {
        let connection = {
            let mut state = room.state.lock();
            state.phase = Phase::Idle;
            state.connection.take()
        };
        if let Some(connection) = connection {
            if connection.is_active() {
                connection.disconnect().await;
            }
            info!("Queue exhausted, leaving room {room_id}");
            self.emit(PlayerEvent::Disconnected { room: room_id });
        }
    }

    /// Re-enter the driver when this playback ends, however it ends.
    fn watch_playback(&self, room_id: RoomId, handle: PlaybackHandle) {
        let player = self.clone();
        tokio::spawn(async move {
            handle.finished().await;
            player.on_track_finished(room_id, handle.id()).await;
        });
    }

    async fn on_track_finished(&self, room_id: RoomId, handle_id: u64) {
        let room = self.rooms.get_or_create(room_id);
        {
            let mut state = room.state.lock();
            // A late notification for a superseded handle must not clear the
            // slot of whatever plays now.
            if state
                .playback
                .as_ref()
                .is_some_and(|h| h.id() == handle_id)
            {
                state.playback = None;
                if state.phase == Phase::Playing {
                    state.phase = Phase::Idle;
                }
            }
        }
        self.step(room_id).await;
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
