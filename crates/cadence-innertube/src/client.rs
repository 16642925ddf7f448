//! `InnerTube` API client implementation.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::{Error, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::credentials::Credentials;
use crate::persona::Persona;

const BASE_URL: &str = "https://www.youtube.com/youtubei/v1";
const ORIGIN: &str = "https://www.youtube.com";
const REFERER: &str = "https://www.youtube.com/";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of transport-level retries for failed requests.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_RETRY_DELAY_MS: u64 = 500;

/// Cache entry with expiration.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: std::time::Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: std::time::Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        std::time::Instant::now() >= self.expires_at
    }
}

/// `YouTube` `InnerTube` API client.
#[derive(Clone)]
pub struct InnerTubeClient {
    /// HTTP client for making requests.
    http: reqwest::Client,
    /// Credentials applied to contexts, payloads, and headers.
    pub(crate) credentials: Credentials,
    /// In-memory cache for responses.
    cache: Arc<DashMap<String, CacheEntry<Vec<u8>>>>,
    /// Cache TTL for API responses.
    cache_ttl: Duration,
    /// Request-window throttle state.
    window: Arc<RwLock<RequestWindow>>,
}

#[derive(Debug, Default)]
struct RequestWindow {
    /// Number of requests made in the current window.
    request_count: u32,
    /// Window start for request counting.
    window_start: Option<std::time::Instant>,
}

impl RequestWindow {
    /// One-minute window, 100 requests.
    fn check_and_increment(&mut self) -> bool {
        let now = std::time::Instant::now();

        let window_duration = Duration::from_secs(60);
        if self
            .window_start
            .map_or(true, |start| now.duration_since(start) > window_duration)
        {
            self.window_start = Some(now);
            self.request_count = 0;
        }

        if self.request_count >= 100 {
            return false;
        }

        self.request_count += 1;
        true
    }
}

impl InnerTubeClient {
    /// Create a new client without credentials.
    pub fn new() -> Result<Self> {
        Self::with_credentials(Credentials::default())
    }

    /// Create a new client with the given credentials.
    pub fn with_credentials(credentials: Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Origin", HeaderValue::from_static(ORIGIN));
        headers.insert("Referer", HeaderValue::from_static(REFERER));

        if let Some(cookie) = &credentials.cookie {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => warn!("Ignoring cookie credential: {e}"),
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            credentials,
            cache: Arc::new(DashMap::new()),
            cache_ttl: Duration::from_secs(300),
            window: Arc::new(RwLock::new(RequestWindow::default())),
        })
    }

    /// Set the cache TTL for API responses.
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Make a POST request to an `InnerTube` endpoint on behalf of a persona.
    pub(crate) async fn post<T, R>(&self, endpoint: &str, persona: &Persona, body: &T) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{BASE_URL}/{endpoint}?key={}", persona.api_key());
        let body_bytes = serde_json::to_vec(body)?;

        let cache_key = cache_key(endpoint, &persona.client_name, &body_bytes);
        if let Some(cached) = self.get_cached(&cache_key) {
            debug!("Cache hit for {endpoint} ({})", persona.client_name);
            return serde_json::from_slice(&cached).map_err(|e| Error::Parse(e.to_string()));
        }

        {
            let mut window = self.window.write();
            if !window.check_and_increment() {
                return Err(Error::Network("request window exhausted".to_string()));
            }
        }

        let mut last_error = None;
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(BASE_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                debug!("Retry attempt {attempt} for {endpoint} after {delay:?}");
            }

            match self.do_request(&url, persona, &body_bytes).await {
                Ok(response_bytes) => {
                    self.set_cached(cache_key, response_bytes.clone());

                    return serde_json::from_slice(&response_bytes)
                        .map_err(|e| Error::Parse(format!("Failed to parse response: {e}")));
                }
                Err(e) => {
                    warn!(
                        "Request to {endpoint} as {} failed (attempt {attempt}): {e}",
                        persona.client_name
                    );

                    if !e.is_retryable() {
                        return Err(e);
                    }

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Network("Request failed".to_string())))
    }

    async fn do_request(&self, url: &str, persona: &Persona, body: &[u8]) -> Result<Vec<u8>> {
        let mut request = self
            .http
            .post(url)
            .header("X-YouTube-Client-Name", persona.client_id().to_string())
            .header("X-YouTube-Client-Version", persona.client_version.clone())
            .body(body.to_vec());

        if let Some(ua) = &persona.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua.clone());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Http(cadence_core::HttpError::Timeout)
            } else if e.is_connect() {
                Error::Http(cadence_core::HttpError::ConnectionFailed(e.to_string()))
            } else {
                Error::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Http(cadence_core::HttpError::StatusError {
                status: status.as_u16(),
                message,
            }));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::Network(format!("Failed to read response body: {e}")))
    }

    fn get_cached(&self, key: &str) -> Option<Vec<u8>> {
        let entry = self.cache.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.cache.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn set_cached(&self, key: String, value: Vec<u8>) {
        let entry = CacheEntry::new(value, self.cache_ttl);
        self.cache.insert(key, entry);

        if self.cache.len() > 100 {
            self.cleanup_cache();
        }
    }

    fn cleanup_cache(&self) {
        self.cache.retain(|_, entry| !entry.is_expired());
    }

    /// Clear the response cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Get the number of cached entries.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

fn cache_key(endpoint: &str, client_name: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(client_name.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}
