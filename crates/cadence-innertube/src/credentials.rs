//! Environment-based extraction credentials.
//!
//! All three values are optional; anonymous extraction works without them
//! but is blocked sooner.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

/// Environment variable carrying the proof-of-origin token.
const ENV_PO_TOKEN: &str = "YOUTUBE_PO_TOKEN";
/// Environment variable carrying the visitor-data token.
const ENV_VISITOR_DATA: &str = "YOUTUBE_VISITOR_DATA";
/// Environment variable carrying a base64-encoded cookie header value.
const ENV_COOKIES_B64: &str = "YOUTUBE_COOKIES_B64";

/// Optional tokens that raise the extraction service's trust in our requests.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Proof-of-origin token, injected into player payloads.
    pub po_token: Option<String>,
    /// Visitor-data token, injected into the client context.
    pub visitor_data: Option<String>,
    /// Cookie header value, sent with every request.
    pub cookie: Option<String>,
}

impl Credentials {
    /// Load credentials from the environment.
    pub fn from_env() -> Self {
        Self {
            po_token: non_empty_env(ENV_PO_TOKEN),
            visitor_data: non_empty_env(ENV_VISITOR_DATA),
            cookie: non_empty_env(ENV_COOKIES_B64).and_then(|blob| decode_cookie_blob(&blob)),
        }
    }

    /// Whether any credential is present.
    pub const fn is_empty(&self) -> bool {
        self.po_token.is_none() && self.visitor_data.is_none() && self.cookie.is_none()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn decode_cookie_blob(blob: &str) -> Option<String> {
    let bytes = match STANDARD.decode(blob) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Ignoring {ENV_COOKIES_B64}: not valid base64: {e}");
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(cookie) => {
            let cookie = cookie.trim().to_string();
            (!cookie.is_empty()).then_some(cookie)
        }
        Err(e) => {
            warn!("Ignoring {ENV_COOKIES_B64}: not valid UTF-8: {e}");
            None
        }
    }
}
