/// Content fetch gateway
///
/// Normalizes raw video provider responses into [`VideoItem`] pages and
/// extracts pagination cursors. The trait is the seam consumed by the
/// discovery service; [`http::HttpVideoGateway`] is the production client.
pub mod http;

use async_trait::async_trait;

use crate::domain::{ResultPage, SearchFilters, VideoItem};
use crate::error::CoreResult;

pub use http::HttpVideoGateway;

/// Read-only access to the external video provider.
///
/// No retries happen at this layer; the caller decides.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoGateway: Send + Sync {
    /// Most-popular music videos for a region. `cursor` must come from a
    /// previous trending page for the same region, or be absent.
    async fn trending(&self, region: &str, cursor: Option<String>) -> CoreResult<ResultPage>;

    /// Search music videos. `query` is non-empty and trimmed by the caller;
    /// `cursor` must come from the same (query, filters) identity.
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        cursor: Option<String>,
    ) -> CoreResult<ResultPage>;

    /// Finite, non-paginated related-video lookup.
    async fn related(&self, video_id: &str) -> CoreResult<Vec<VideoItem>>;
}
