//! Scripted collaborator fakes shared by the crate's tests.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadence_core::{
    ChannelId, Error, ExtractedInfo, Result, RoomId, SourceFormat, SourceVariant, TrackSource,
    TrackSummary, TransportHeaders,
};
use cadence_voice::{PlaybackHandle, VoiceConnection, VoiceTransport};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Extraction source driven by scripted responses.
///
/// `extract` pops the next scripted result per call; an unscripted call
/// fails. `search` pops scripted result sets and records queries.
pub(crate) struct FakeSource {
    extract_script: Mutex<VecDeque<Result<ExtractedInfo>>>,
    search_script: Mutex<VecDeque<Result<Vec<TrackSummary>>>>,
    pub variants_seen: Mutex<Vec<SourceVariant>>,
    pub extract_urls: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            extract_script: Mutex::new(VecDeque::new()),
            search_script: Mutex::new(VecDeque::new()),
            variants_seen: Mutex::new(Vec::new()),
            extract_urls: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn push_extract(&self, result: Result<ExtractedInfo>) {
        self.extract_script.lock().push_back(result);
    }

    pub fn push_search(&self, result: Result<Vec<TrackSummary>>) {
        self.search_script.lock().push_back(result);
    }

    /// Script one failed resolution: every variant errors.
    pub fn push_failed_resolution(&self, message: &str) {
        for _ in SourceVariant::ALL {
            self.push_extract(Err(Error::Extraction(message.to_string())));
        }
    }

    /// Script one blocked resolution: every variant reports a service block.
    pub fn push_blocked_resolution(&self) {
        for _ in SourceVariant::ALL {
            self.push_extract(Err(Error::ServiceBlock(
                "sign in to confirm you're not a bot".to_string(),
            )));
        }
    }

    /// Script one successful resolution on the first variant.
    pub fn push_ok_resolution(&self, id: &str, title: &str) {
        self.push_extract(Ok(info_with_formats(
            id,
            title,
            vec![audio_format(&format!("https://stream/{id}"), 140_000)],
        )));
    }

    /// Make the next `extract` call wait until the returned gate is
    /// notified.
    pub fn gate_next_extract(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl TrackSource for FakeSource {
    async fn extract(&self, url: &str, variant: SourceVariant) -> Result<ExtractedInfo> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.variants_seen.lock().push(variant);
        self.extract_urls.lock().push(url.to_string());
        self.extract_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Extraction(format!("unscripted extract for {url}"))))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>> {
        self.searches.lock().push(query.to_string());
        match self.search_script.lock().pop_front() {
            Some(result) => result.map(|mut hits| {
                hits.truncate(limit);
                hits
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// An audio-only format with the given stream URL and average bitrate.
pub(crate) fn audio_format(url: &str, avg_bitrate: u32) -> SourceFormat {
    SourceFormat {
        url: Some(url.to_string()),
        audio_codec: Some("opus".to_string()),
        video_codec: None,
        avg_bitrate: Some(avg_bitrate),
        total_bitrate: Some(avg_bitrate),
    }
}

/// A muxed audio+video format with the given total bitrate.
pub(crate) fn muxed_format(url: &str, total_bitrate: u32) -> SourceFormat {
    SourceFormat {
        url: Some(url.to_string()),
        audio_codec: Some("mp4a.40.2".to_string()),
        video_codec: Some("avc1.4d401f".to_string()),
        avg_bitrate: None,
        total_bitrate: Some(total_bitrate),
    }
}

pub(crate) fn info_with_formats(id: &str, title: &str, formats: Vec<SourceFormat>) -> ExtractedInfo {
    ExtractedInfo {
        id: id.to_string(),
        title: title.to_string(),
        formats,
        http_headers: None,
    }
}

/// Voice transport handing out [`FakeConnection`]s.
pub(crate) struct FakeVoice {
    pub connections: Mutex<Vec<Arc<FakeConnection>>>,
    pub fail_connect: AtomicBool,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            fail_connect: AtomicBool::new(false),
        }
    }

    pub fn last_connection(&self) -> Arc<FakeConnection> {
        self.connections.lock().last().unwrap().clone()
    }
}

#[async_trait]
impl VoiceTransport for FakeVoice {
    async fn connect(
        &self,
        _room: RoomId,
        _channel: ChannelId,
        _timeout: Duration,
    ) -> Result<Arc<dyn VoiceConnection>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::ConnectFailure("connect timed out".to_string()));
        }
        let connection = Arc::new(FakeConnection::new());
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }
}

/// Voice connection recording started streams.
pub(crate) struct FakeConnection {
    active: AtomicBool,
    next_id: AtomicU64,
    pub started: Mutex<Vec<String>>,
    pub current: Mutex<Option<PlaybackHandle>>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            started: Mutex::new(Vec::new()),
            current: Mutex::new(None),
        }
    }

    /// Simulate the transport reporting the active playback as ended.
    pub fn finish_current(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.signal_finished();
        }
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn start_stream(
        &self,
        stream_url: &str,
        _headers: &TransportHeaders,
    ) -> Result<PlaybackHandle> {
        let handle = PlaybackHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.started.lock().push(stream_url.to_string());
        *self.current.lock() = Some(handle.clone());
        Ok(handle)
    }

    async fn stop(&self, handle: &PlaybackHandle) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|h| h.id() == handle.id()) {
            *current = None;
        }
        handle.signal_finished();
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Poll until `condition` holds, failing the test after two seconds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
