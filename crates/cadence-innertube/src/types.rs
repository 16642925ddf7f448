//! InnerTube-specific request and response structures.

use serde::{Deserialize, Serialize};

use crate::persona::ClientContext;

/// Request body for `InnerTube` endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct InnerTubeRequest<T> {
    pub context: ClientContext,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> InnerTubeRequest<T> {
    pub const fn new(context: ClientContext, payload: T) -> Self {
        Self { context, payload }
    }
}

/// Player request payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPayload {
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_check_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub racy_check_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_integrity_dimensions: Option<ServiceIntegrityDimensions>,
}

/// Proof-of-origin wrapper inside a player payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegrityDimensions {
    pub po_token: String,
}

/// Search request payload.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPayload {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

/// Raw `InnerTube` response for the player endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub video_details: Option<VideoDetails>,
    pub streaming_data: Option<StreamingData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    pub formats: Option<Vec<RawFormat>>,
    pub adaptive_formats: Option<Vec<RawFormat>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFormat {
    pub itag: Option<u32>,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub bitrate: Option<u32>,
    pub average_bitrate: Option<u32>,
    pub signature_cipher: Option<String>,
    pub cipher: Option<String>,
}

/// Raw `InnerTube` response for the search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResponse {
    pub contents: Option<SearchContents>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContents {
    pub two_column_search_results_renderer: Option<TwoColumnSearchResultsRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoColumnSearchResultsRenderer {
    pub primary_contents: Option<PrimaryContents>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryContents {
    pub section_list_renderer: Option<SectionListRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionListRenderer {
    pub contents: Option<Vec<SearchSection>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSection {
    pub item_section_renderer: Option<ItemSectionRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSectionRenderer {
    pub contents: Option<Vec<SearchItem>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub video_renderer: Option<VideoRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRenderer {
    pub video_id: String,
    pub title: Option<TextRuns>,
}

/// Text that may arrive as runs or as simple text.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRuns {
    pub runs: Option<Vec<TextRun>>,
    pub simple_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextRun {
    pub text: String,
}

impl TextRuns {
    /// Concatenated text content.
    pub fn text(&self) -> String {
        if let Some(simple) = &self.simple_text {
            return simple.clone();
        }
        self.runs
            .as_ref()
            .map(|runs| runs.iter().map(|r| r.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}
