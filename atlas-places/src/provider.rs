use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{LocationBias, MediaProbe, PlaceCandidate, PlaceMedia};

/// The place-search and media operations the reconciliation pipeline needs.
///
/// `GooglePlacesClient` is the production implementation; tests supply
/// scripted fakes.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Free-text search. Results are in provider relevance order; an empty
    /// list means nothing matched.
    async fn text_search(
        &self,
        query: &str,
        bias: Option<LocationBias>,
    ) -> Result<Vec<PlaceCandidate>, ProviderError>;

    /// Fetch only the media references for a place.
    async fn place_media(&self, place_id: &str) -> Result<PlaceMedia, ProviderError>;

    /// Build the fetch URL for a media reference. Never performs I/O.
    fn media_url(&self, reference: &str) -> String;

    /// Header-only fetch of a media URL, following redirects.
    async fn probe_media(&self, url: &str) -> Result<MediaProbe, ProviderError>;
}
