//! Extraction results: declared formats, transport headers, client variants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Extraction client variants, in the fixed order the resolver tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceVariant {
    Web,
    Android,
    Ios,
}

impl SourceVariant {
    /// Fallback order for resolution attempts.
    pub const ALL: [Self; 3] = [Self::Web, Self::Android, Self::Ios];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

/// One format declared by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFormat {
    /// Direct stream URL. Cipher-protected formats carry none and are never
    /// selected.
    pub url: Option<String>,
    /// Declared audio codec, absent for video-only formats.
    pub audio_codec: Option<String>,
    /// Declared video codec, absent for audio-only formats.
    pub video_codec: Option<String>,
    /// Declared average bitrate in bits per second.
    pub avg_bitrate: Option<u32>,
    /// Declared total bitrate in bits per second.
    pub total_bitrate: Option<u32>,
}

impl SourceFormat {
    /// Whether the format declares a usable audio track.
    pub fn has_audio(&self) -> bool {
        self.audio_codec
            .as_deref()
            .is_some_and(|c| !c.is_empty() && c != "none")
    }

    /// Whether the format carries audio and no video track.
    pub fn is_audio_only(&self) -> bool {
        let no_video = self
            .video_codec
            .as_deref()
            .map_or(true, |c| c.is_empty() || c == "none");
        self.has_audio() && no_video
    }
}

/// The extraction service's answer for one track.
#[derive(Debug, Clone, Default)]
pub struct ExtractedInfo {
    /// Source identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Declared formats, in service order.
    pub formats: Vec<SourceFormat>,
    /// HTTP headers the stream fetch must carry, when the service declared
    /// any.
    pub http_headers: Option<HashMap<String, String>>,
}

/// Headers a transport must send when fetching the chosen stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHeaders {
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
}

impl Default for TransportHeaders {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://www.youtube.com/".to_string(),
            origin: "https://www.youtube.com".to_string(),
        }
    }
}

impl TransportHeaders {
    /// Build from a declared header map, filling gaps with the defaults.
    pub fn from_declared(headers: Option<&HashMap<String, String>>) -> Self {
        let mut out = Self::default();
        let Some(headers) = headers else {
            return out;
        };
        for (key, value) in headers {
            match key.to_ascii_lowercase().as_str() {
                "user-agent" => out.user_agent = value.clone(),
                "referer" => out.referer = value.clone(),
                "origin" => out.origin = value.clone(),
                _ => {}
            }
        }
        out
    }
}

/// A track reference after successful lookup: playable stream plus metadata.
/// Created fresh per resolution attempt and discarded once playback starts.
#[derive(Debug, Clone)]
pub struct ResolvedTrack {
    /// Display title.
    pub title: String,
    /// Source identifier.
    pub source_id: String,
    /// The chosen playable stream URL.
    pub stream_url: String,
    /// Headers the stream fetch must carry.
    pub headers: TransportHeaders,
    /// Which extraction variant produced this result. Diagnostic only.
    pub variant: SourceVariant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_only_detection() {
        let audio = SourceFormat {
            audio_codec: Some("opus".into()),
            ..Default::default()
        };
        assert!(audio.has_audio());
        assert!(audio.is_audio_only());

        let muxed = SourceFormat {
            audio_codec: Some("mp4a.40.2".into()),
            video_codec: Some("avc1.4d401f".into()),
            ..Default::default()
        };
        assert!(muxed.has_audio());
        assert!(!muxed.is_audio_only());

        let video_only = SourceFormat {
            video_codec: Some("vp9".into()),
            ..Default::default()
        };
        assert!(!video_only.has_audio());

        let none_marker = SourceFormat {
            audio_codec: Some("none".into()),
            ..Default::default()
        };
        assert!(!none_marker.has_audio());
    }

    #[test]
    fn test_headers_defaulted_when_absent() {
        let headers = TransportHeaders::from_declared(None);
        assert_eq!(headers.origin, "https://www.youtube.com");

        let mut declared = HashMap::new();
        declared.insert("User-Agent".to_string(), "custom/1.0".to_string());
        let headers = TransportHeaders::from_declared(Some(&declared));
        assert_eq!(headers.user_agent, "custom/1.0");
        assert_eq!(headers.referer, "https://www.youtube.com/");
    }

    #[test]
    fn test_variant_order_is_fixed() {
        assert_eq!(
            SourceVariant::ALL,
            [SourceVariant::Web, SourceVariant::Android, SourceVariant::Ios]
        );
    }
}
