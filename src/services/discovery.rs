use std::sync::Arc;

use crate::config::ApiKeyHandle;
use crate::domain::{SearchFilters, VideoItem};
use crate::error::{CoreError, CoreResult};
use crate::gateway::VideoGateway;
use crate::services::stream::{CommitOutcome, FetchTicket, ResultStream, StreamIdentity, StreamMode};

/// Drives the video gateway against one result stream.
///
/// This is the state the UI binds to for the discovery surface: the current
/// result set, the selected video and its related list. All network waits
/// suspend; commits go through the stream's ticket protocol so late
/// responses for a superseded identity are discarded, never merged.
pub struct DiscoveryService {
    gateway: Arc<dyn VideoGateway>,
    credentials: ApiKeyHandle,
    stream: ResultStream,
    selected: Option<VideoItem>,
    related: Vec<VideoItem>,
    seen_epoch: u64,
}

impl DiscoveryService {
    pub fn new(gateway: Arc<dyn VideoGateway>, credentials: ApiKeyHandle) -> Self {
        let seen_epoch = credentials.epoch();
        Self {
            gateway,
            credentials,
            stream: ResultStream::new(),
            selected: None,
            related: Vec::new(),
            seen_epoch,
        }
    }

    /// Search music videos, replacing any current result set.
    pub async fn search(&mut self, query: &str, filters: SearchFilters) -> CoreResult<()> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::InvalidInput("Search query is empty".to_string()));
        }
        self.credentials.require_key()?;
        self.sync_credentials();

        let ticket = self
            .stream
            .start(StreamIdentity::search(query, filters.clone()));
        let result = self.gateway.search(query, &filters, None).await;
        self.resolve(ticket, result)
    }

    /// Load the first page of trending music for a region, replacing any
    /// current result set.
    pub async fn load_trending(&mut self, region: &str) -> CoreResult<()> {
        self.credentials.require_key()?;
        self.sync_credentials();

        let ticket = self.stream.start(StreamIdentity::trending(region));
        let result = self.gateway.trending(region, None).await;
        self.resolve(ticket, result)
    }

    /// Fetch the next page of the current stream, appending in order.
    ///
    /// Returns `Ok(false)` without any network call when a fetch is already
    /// in flight, the stream is exhausted, or nothing has been loaded yet.
    pub async fn load_more(&mut self) -> CoreResult<bool> {
        self.sync_credentials();

        let Some(ticket) = self.stream.request_more() else {
            return Ok(false);
        };

        let identity = ticket.identity().clone();
        let result = match identity.mode {
            StreamMode::Trending => {
                self.gateway
                    .trending(
                        &identity.filters.region_code,
                        ticket.cursor().map(str::to_string),
                    )
                    .await
            }
            StreamMode::Search => {
                self.gateway
                    .search(
                        &identity.query,
                        &identity.filters,
                        ticket.cursor().map(str::to_string),
                    )
                    .await
            }
        };

        self.resolve(ticket, result)?;
        Ok(true)
    }

    /// Select a video and load its related list. Related lookups are best
    /// effort: a failure clears the list and is logged, not surfaced.
    pub async fn select_video(&mut self, video: VideoItem) {
        let video_id = video.id.clone();
        self.selected = Some(video);
        self.load_related(&video_id).await;
    }

    pub async fn load_related(&mut self, video_id: &str) {
        self.sync_credentials();

        match self.gateway.related(video_id).await {
            Ok(items) => self.related = items,
            Err(err) => {
                tracing::warn!(video_id, error = %err, "Failed to load related videos");
                self.related.clear();
            }
        }
    }

    /// Drop all loaded content, the selection and the related list.
    pub fn clear_results(&mut self) {
        self.stream.reset();
        self.selected = None;
        self.related.clear();
    }

    pub fn videos(&self) -> &[VideoItem] {
        self.stream.items()
    }

    pub fn selected_video(&self) -> Option<&VideoItem> {
        self.selected.as_ref()
    }

    pub fn related_videos(&self) -> &[VideoItem] {
        &self.related
    }

    pub fn is_loading(&self) -> bool {
        self.stream.is_loading()
    }

    /// Whether another page may exist for the current stream.
    pub fn has_more(&self) -> bool {
        self.stream.cursor().is_some()
    }

    pub fn credentials(&self) -> &ApiKeyHandle {
        &self.credentials
    }

    /// A credential change invalidates everything keyed to the old epoch,
    /// exactly like a filter change.
    fn sync_credentials(&mut self) {
        let epoch = self.credentials.epoch();
        if epoch != self.seen_epoch {
            tracing::debug!(epoch, "API credential changed, resetting streams");
            self.seen_epoch = epoch;
            self.stream.reset();
            self.selected = None;
            self.related.clear();
        }
    }

    /// Commit or roll back one resolved fetch. Re-syncs the credential
    /// epoch first so a key change during the network wait turns the
    /// ticket stale instead of committing against the new epoch.
    fn resolve(
        &mut self,
        ticket: FetchTicket,
        result: CoreResult<crate::domain::ResultPage>,
    ) -> CoreResult<()> {
        self.sync_credentials();

        match result {
            Ok(page) => {
                if let CommitOutcome::Committed { appended } = self.stream.commit(&ticket, page) {
                    tracing::debug!(appended, total = self.stream.items().len(), "Committed result page");
                }
                Ok(())
            }
            Err(err) => {
                self.stream.fail(&ticket);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResultPage;
    use crate::gateway::MockVideoGateway;
    use chrono::Utc;

    fn video(id: &str) -> VideoItem {
        VideoItem {
            id: id.to_string(),
            title: format!("title {}", id),
            channel_title: "channel".to_string(),
            thumbnail_url: "https://thumbs.test/a.jpg".to_string(),
            published_at: Utc::now(),
            view_count: None,
            description: None,
        }
    }

    fn page(ids: &[&str], cursor: Option<&str>) -> ResultPage {
        ResultPage {
            items: ids.iter().map(|id| video(id)).collect(),
            next_cursor: cursor.map(|c| c.to_string()),
        }
    }

    fn service_with(mock: MockVideoGateway) -> DiscoveryService {
        DiscoveryService::new(Arc::new(mock), ApiKeyHandle::new("test-key"))
    }

    #[tokio::test]
    async fn search_then_load_more_appends_pages() {
        let mut mock = MockVideoGateway::new();
        mock.expect_search()
            .withf(|q, _, cursor| q == "lofi" && cursor.is_none())
            .times(1)
            .returning(|_, _, _| Ok(page(&["a", "b"], Some("c1"))));
        mock.expect_search()
            .withf(|q, _, cursor| q == "lofi" && cursor.as_deref() == Some("c1"))
            .times(1)
            .returning(|_, _, _| Ok(page(&["c"], None)));

        let mut service = service_with(mock);
        service.search("lofi", SearchFilters::default()).await.unwrap();
        assert_eq!(service.videos().len(), 2);
        assert!(service.has_more());

        assert!(service.load_more().await.unwrap());
        assert_eq!(service.videos().len(), 3);
        assert!(!service.has_more());

        // Exhausted: no further provider call is made.
        assert!(!service.load_more().await.unwrap());
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_network_call() {
        let mock = MockVideoGateway::new();
        let mut service = service_with(mock);

        let err = service
            .search("   ", SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_api_key_is_a_config_error() {
        let mock = MockVideoGateway::new();
        let mut service = DiscoveryService::new(Arc::new(mock), ApiKeyHandle::unset());

        let err = service.load_trending("US").await.unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[tokio::test]
    async fn fetch_failure_keeps_prior_results() {
        let mut mock = MockVideoGateway::new();
        mock.expect_trending()
            .times(1)
            .returning(|_, _| Ok(page(&["a", "b"], Some("c1"))));
        mock.expect_trending()
            .times(1)
            .returning(|_, _| Err(CoreError::Upstream("boom".to_string())));

        let mut service = service_with(mock);
        service.load_trending("US").await.unwrap();

        let err = service.load_more().await.unwrap_err();
        assert!(matches!(err, CoreError::Upstream(_)));
        assert_eq!(service.videos().len(), 2);
        // The cursor survives for a retry.
        assert!(service.has_more());
    }

    #[tokio::test]
    async fn key_change_invalidates_loaded_results() {
        let mut mock = MockVideoGateway::new();
        mock.expect_search()
            .times(1)
            .returning(|_, _, _| Ok(page(&["a"], Some("c1"))));

        let mut service = service_with(mock);
        service.search("lofi", SearchFilters::default()).await.unwrap();
        assert_eq!(service.videos().len(), 1);

        service.credentials().set_key("rotated");

        // Next operation observes the epoch change and resets; with the
        // stream gone there is nothing to page through.
        assert!(!service.load_more().await.unwrap());
        assert!(service.videos().is_empty());
    }

    #[tokio::test]
    async fn related_failures_are_swallowed() {
        let mut mock = MockVideoGateway::new();
        mock.expect_related()
            .times(1)
            .returning(|_| Err(CoreError::Upstream("boom".to_string())));

        let mut service = service_with(mock);
        service.select_video(video("a")).await;

        assert_eq!(service.selected_video().unwrap().id, "a");
        assert!(service.related_videos().is_empty());
    }
}
