//! Source resolver: multi-variant extraction fallback and format selection.

use std::sync::Arc;

use cadence_core::{
    Error, ResolvedTrack, Result, SourceFormat, SourceVariant, TrackRef, TrackSource,
    TransportHeaders,
};
use tracing::debug;

/// Resolves track references into playable streams, falling back through the
/// extraction variants in their fixed order.
#[derive(Clone)]
pub struct Resolver {
    source: Arc<dyn TrackSource>,
}

impl Resolver {
    pub fn new(source: Arc<dyn TrackSource>) -> Self {
        Self { source }
    }

    /// Resolve a track reference into a playable stream plus metadata.
    ///
    /// The first variant yielding a playable audio stream wins; when all
    /// fail, the last attempt's error is surfaced.
    pub async fn resolve(&self, track: &TrackRef) -> Result<ResolvedTrack> {
        let url = match track {
            TrackRef::Url(url) => url.clone(),
            TrackRef::Query(query) => {
                let results = self.source.search(query, 1).await?;
                results
                    .into_iter()
                    .next()
                    .map(|hit| hit.watch_url())
                    .ok_or_else(|| Error::NoSearchResults(query.clone()))?
            }
        };

        let mut last_error = None;
        for variant in SourceVariant::ALL {
            match self.try_variant(&url, variant).await {
                Ok(resolved) => {
                    debug!(
                        "Resolved \"{}\" via {} variant",
                        resolved.title,
                        variant.as_str()
                    );
                    return Ok(resolved);
                }
                Err(e) => {
                    debug!("Variant {} failed for {url}: {e}", variant.as_str());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Extraction(format!("no attempt made for {url}"))))
    }

    async fn try_variant(&self, url: &str, variant: SourceVariant) -> Result<ResolvedTrack> {
        let info = self.source.extract(url, variant).await?;

        let stream_url = match select_format(&info.formats).and_then(|f| f.url.clone()) {
            Some(url) => url,
            None => return Err(Error::NoPlayableAudio(info.title)),
        };

        Ok(ResolvedTrack {
            headers: TransportHeaders::from_declared(info.http_headers.as_ref()),
            title: info.title,
            source_id: info.id,
            stream_url,
            variant,
        })
    }
}

/// Pick the stream to play from one attempt's declared formats.
///
/// Audio-only formats win, ranked by declared average bitrate; failing that,
/// any format carrying audio, ranked by declared total bitrate. Formats
/// without a usable URL never qualify.
pub(crate) fn select_format(formats: &[SourceFormat]) -> Option<&SourceFormat> {
    let audio_only = formats
        .iter()
        .filter(|f| f.url.is_some() && f.is_audio_only())
        .max_by_key(|f| f.avg_bitrate.unwrap_or(0));
    if audio_only.is_some() {
        return audio_only;
    }

    formats
        .iter()
        .filter(|f| f.url.is_some() && f.has_audio())
        .max_by_key(|f| f.total_bitrate.unwrap_or(0))
}
