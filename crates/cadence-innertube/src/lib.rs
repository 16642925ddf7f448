//! # cadence-innertube
//!
//! `YouTube` `InnerTube` API client for Cadence.
//!
//! Implements the extraction-service side of playback: per-variant client
//! personas for the player endpoint, video search, and environment-based
//! credential injection.

pub mod client;
pub mod credentials;
pub mod endpoints;
pub mod persona;
pub mod types;

use async_trait::async_trait;
use cadence_core::{Error, ExtractedInfo, Result, SourceVariant, TrackSource, TrackSummary};

pub use client::InnerTubeClient;
pub use credentials::Credentials;
pub use persona::{ClientContext, Persona};

#[async_trait]
impl TrackSource for InnerTubeClient {
    async fn extract(&self, url: &str, variant: SourceVariant) -> Result<ExtractedInfo> {
        let video_id = cadence_core::video_id_from_url(url)
            .ok_or_else(|| Error::Extraction(format!("no video id in {url}")))?;
        self.player(&video_id, variant).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackSummary>> {
        self.search_videos(query, limit).await
    }
}
