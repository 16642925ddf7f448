//! Collaborator traits consumed by the orchestration core.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ExtractedInfo, SourceVariant, TrackSummary};

/// The remote extraction service.
///
/// One `extract` call is a single attempt with a single client variant;
/// variant fallback is the resolver's job. `search` ordering is whatever the
/// service returns.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Extract title, identifier, and declared formats for a watch URL.
    async fn extract(&self, url: &str, variant: SourceVariant) -> Result<ExtractedInfo>;

    /// Search for tracks, returning at most `limit` rows in service order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>>;
}
