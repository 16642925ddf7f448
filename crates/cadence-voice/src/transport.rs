//! Voice-session transport traits.
//!
//! A concrete transport owns the actual voice connection; the driver only
//! sees these traits. Playback end is a bare notification: natural end and
//! interruption are indistinguishable at this boundary, and the driver
//! treats both as "advance".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadence_core::{ChannelId, Result, RoomId, TransportHeaders};
use tokio::sync::Notify;

/// The voice-session transport collaborator.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Join a voice channel, waiting at most `timeout`.
    async fn connect(
        &self,
        room: RoomId,
        channel: ChannelId,
        timeout: Duration,
    ) -> Result<Arc<dyn VoiceConnection>>;
}

/// One live voice connection.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Start streaming a resolved track into the session.
    ///
    /// The returned handle signals `finished` when playback ends for any
    /// reason.
    async fn start_stream(
        &self,
        stream_url: &str,
        headers: &TransportHeaders,
    ) -> Result<PlaybackHandle>;

    /// Stop an in-progress playback. The handle still signals `finished`.
    async fn stop(&self, handle: &PlaybackHandle);

    /// Whether the connection is still live.
    fn is_active(&self) -> bool;

    /// Leave the voice channel.
    async fn disconnect(&self);
}

/// Handle to one playback started on a connection.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: u64,
    finished: Arc<Notify>,
}

impl PlaybackHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            finished: Arc::new(Notify::new()),
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Transport side: mark this playback as ended. The stored permit means
    /// a waiter that arrives late still observes the signal.
    pub fn signal_finished(&self) {
        self.finished.notify_one();
    }

    /// Driver side: resolve when playback has ended.
    pub async fn finished(&self) {
        self.finished.notified().await;
    }
}
