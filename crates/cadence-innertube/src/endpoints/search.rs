//! Search endpoint: video lookup for requests and supply strategies.

use cadence_core::{normalize_watch_url, Result, TrackSummary};
use tracing::debug;

use crate::persona::{ClientContext, Persona};
use crate::types::{InnerTubeRequest, RawSearchResponse, SearchPayload};
use crate::InnerTubeClient;

/// Filter param restricting results to videos.
const VIDEO_FILTER: &str = "EgIQAQ%3D%3D";

impl InnerTubeClient {
    /// Search for videos, returning at most `limit` rows in service order.
    pub async fn search_videos(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>> {
        let persona =
            Persona::web().with_visitor_data(self.credentials.visitor_data.clone());

        let payload = SearchPayload {
            query: query.to_string(),
            params: Some(VIDEO_FILTER.to_string()),
        };

        let request = InnerTubeRequest::new(ClientContext::new(persona.clone()), payload);
        let response: RawSearchResponse = self.post("search", &persona, &request).await?;

        let mut results = parse_search_results(&response);
        results.truncate(limit);
        debug!("Search \"{query}\" returned {} rows", results.len());
        Ok(results)
    }
}

fn parse_search_results(response: &RawSearchResponse) -> Vec<TrackSummary> {
    let sections = response
        .contents
        .as_ref()
        .and_then(|c| c.two_column_search_results_renderer.as_ref())
        .and_then(|r| r.primary_contents.as_ref())
        .and_then(|p| p.section_list_renderer.as_ref())
        .and_then(|s| s.contents.as_ref());

    let mut results = Vec::new();
    for section in sections.into_iter().flatten() {
        let items = section
            .item_section_renderer
            .as_ref()
            .and_then(|s| s.contents.as_ref());
        for item in items.into_iter().flatten() {
            if let Some(video) = &item.video_renderer {
                let title = video
                    .title
                    .as_ref()
                    .map(|t| t.text())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| video.video_id.clone());
                results.push(
                    TrackSummary::new(video.video_id.clone(), title)
                        .with_webpage_url(normalize_watch_url(&video.video_id)),
                );
            }
        }
    }
    results
}
