//! Player endpoint: declared-format extraction for one video.

use cadence_core::{matches_block_signature, Error, ExtractedInfo, Result, SourceFormat, SourceVariant};
use tracing::debug;

use crate::persona::{ClientContext, Persona};
use crate::types::{
    InnerTubeRequest, PlayerPayload, RawFormat, RawPlayerResponse, ServiceIntegrityDimensions,
};
use crate::InnerTubeClient;

impl InnerTubeClient {
    /// Fetch title, identifier, and declared formats for a video using one
    /// client persona.
    ///
    /// A playability status other than OK maps to [`Error::ServiceBlock`]
    /// when it carries a login/bot-check signature, otherwise to
    /// [`Error::Extraction`].
    pub async fn player(&self, video_id: &str, variant: SourceVariant) -> Result<ExtractedInfo> {
        let persona = Persona::for_variant(variant)
            .with_visitor_data(self.credentials.visitor_data.clone());

        let payload = PlayerPayload {
            video_id: video_id.to_string(),
            content_check_ok: Some(true),
            racy_check_ok: Some(true),
            service_integrity_dimensions: self
                .credentials
                .po_token
                .clone()
                .map(|po_token| ServiceIntegrityDimensions { po_token }),
        };

        let request = InnerTubeRequest::new(ClientContext::new(persona.clone()), payload);
        let response: RawPlayerResponse = self.post("player", &persona, &request).await?;

        if let Some(status) = &response.playability_status {
            if status.status != "OK" {
                let reason = status.reason.as_deref().unwrap_or(&status.status);
                if status.status == "LOGIN_REQUIRED" || matches_block_signature(reason) {
                    return Err(Error::ServiceBlock(reason.to_string()));
                }
                return Err(Error::Extraction(reason.to_string()));
            }
        }

        let formats = parse_formats(&response);
        debug!(
            "Extracted {} formats for {video_id} via {}",
            formats.len(),
            variant.as_str()
        );

        let details = response.video_details.as_ref();
        Ok(ExtractedInfo {
            id: details
                .and_then(|d| d.video_id.clone())
                .unwrap_or_else(|| video_id.to_string()),
            title: details
                .and_then(|d| d.title.clone())
                .unwrap_or_else(|| video_id.to_string()),
            formats,
            http_headers: None,
        })
    }
}

fn parse_formats(response: &RawPlayerResponse) -> Vec<SourceFormat> {
    let Some(streaming) = &response.streaming_data else {
        return Vec::new();
    };

    let mut formats = Vec::new();
    for raw in streaming
        .adaptive_formats
        .iter()
        .flatten()
        .chain(streaming.formats.iter().flatten())
    {
        formats.push(parse_format(raw));
    }
    formats
}

fn parse_format(raw: &RawFormat) -> SourceFormat {
    let (audio_codec, video_codec) = raw
        .mime_type
        .as_deref()
        .map_or((None, None), split_codecs);

    // Cipher-protected formats carry no usable URL.
    let url = if raw.signature_cipher.is_some() || raw.cipher.is_some() {
        None
    } else {
        raw.url.clone()
    };

    SourceFormat {
        url,
        audio_codec,
        video_codec,
        avg_bitrate: raw.average_bitrate,
        total_bitrate: raw.bitrate,
    }
}

/// Split a mime type like `video/mp4; codecs="avc1.4d401f, mp4a.40.2"` into
/// its audio and video codec declarations.
fn split_codecs(mime: &str) -> (Option<String>, Option<String>) {
    let codecs: Vec<String> = mime
        .split_once("codecs=\"")
        .and_then(|(_, rest)| rest.split('"').next())
        .map(|list| {
            list.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if mime.starts_with("audio/") {
        return (codecs.first().cloned(), None);
    }
    if mime.starts_with("video/") {
        let video = codecs.first().cloned();
        let audio = codecs.get(1).cloned();
        return (audio, video);
    }
    (None, None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_codecs() {
        assert_eq!(
            split_codecs("audio/webm; codecs=\"opus\""),
            (Some("opus".into()), None)
        );
        assert_eq!(
            split_codecs("video/mp4; codecs=\"avc1.4d401f, mp4a.40.2\""),
            (Some("mp4a.40.2".into()), Some("avc1.4d401f".into()))
        );
        assert_eq!(
            split_codecs("video/webm; codecs=\"vp9\""),
            (None, Some("vp9".into()))
        );
    }

    #[test]
    fn test_parse_formats_from_raw_response() {
        let json = r#"{
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {"videoId": "abc123", "title": "A Song"},
            "streamingData": {
                "adaptiveFormats": [
                    {"itag": 251, "url": "https://a/opus", "mimeType": "audio/webm; codecs=\"opus\"", "bitrate": 160000, "averageBitrate": 140000},
                    {"itag": 137, "url": "https://a/video", "mimeType": "video/mp4; codecs=\"avc1.4d401f\"", "bitrate": 4000000},
                    {"itag": 140, "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "bitrate": 130000, "signatureCipher": "s=..."}
                ],
                "formats": [
                    {"itag": 18, "url": "https://a/muxed", "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"", "bitrate": 500000}
                ]
            }
        }"#;
        let response: RawPlayerResponse = serde_json::from_str(json).unwrap();
        let formats = parse_formats(&response);

        assert_eq!(formats.len(), 4);
        assert!(formats[0].is_audio_only());
        assert_eq!(formats[0].avg_bitrate, Some(140_000));
        assert!(!formats[1].has_audio());
        // Cipher-protected format must not expose a URL.
        assert!(formats[2].url.is_none());
        assert!(formats[3].has_audio());
        assert!(!formats[3].is_audio_only());
    }

    #[test]
    fn test_login_required_maps_to_service_block() {
        let json = r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you're not a bot"}}"#;
        let response: RawPlayerResponse = serde_json::from_str(json).unwrap();
        let status = response.playability_status.unwrap();
        assert!(matches_block_signature(status.reason.as_deref().unwrap()));
    }
}
