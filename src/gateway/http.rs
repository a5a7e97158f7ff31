use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::config::{ApiKeyHandle, ProviderConfig};
use crate::domain::{ResultPage, SearchFilters, VideoItem};
use crate::error::{CoreError, CoreResult};
use crate::gateway::VideoGateway;

/// Music category id on the provider side.
const MUSIC_CATEGORY_ID: &str = "10";
/// Cap for related-video lookups.
const RELATED_RESULTS: u32 = 5;

/// HTTP client for the video provider API.
///
/// The API key is read from the shared handle at call time, so a runtime
/// key change takes effect on the next request.
#[derive(Clone)]
pub struct HttpVideoGateway {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    credentials: ApiKeyHandle,
}

impl HttpVideoGateway {
    pub fn new(config: &ProviderConfig, credentials: ApiKeyHandle) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            credentials,
        })
    }

    /// Composed provider query: the user text plus a music hint, with the
    /// language filter folded in when present.
    fn compose_query(query: &str, filters: &SearchFilters) -> String {
        if filters.language.is_empty() {
            format!("{} music", query)
        } else {
            format!("{} {} music", query, filters.language)
        }
    }

    /// Published-time window for the classic/new partition, relative to `now`.
    ///
    /// Classic means published more than 5 years ago; otherwise only content
    /// from the last year. The two windows never overlap.
    fn published_window(is_classic: bool, now: DateTime<Utc>) -> (&'static str, String) {
        if is_classic {
            let before = now - ChronoDuration::days(5 * 365);
            ("publishedBefore", before.to_rfc3339())
        } else {
            let after = now - ChronoDuration::days(365);
            ("publishedAfter", after.to_rfc3339())
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> CoreResult<T> {
        let key = self.credentials.require_key()?;
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", key)])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        // The provider reports errors both via status codes and an error
        // payload on 200 responses; check the payload first.
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
            if let Some(error) = envelope.error {
                return Err(map_provider_error(status.as_u16(), error));
            }
        }
        if !status.is_success() {
            return Err(map_provider_error(
                status.as_u16(),
                ProviderError {
                    message: format!("Provider returned HTTP {}", status),
                    errors: Vec::new(),
                },
            ));
        }

        serde_json::from_slice(&body)
            .map_err(|e| CoreError::Upstream(format!("Malformed provider response: {}", e)))
    }

    /// Second phase of a search: hydrate snippet+statistics for the ids the
    /// listing returned, preserving listing order.
    async fn hydrate_details(&self, video_ids: &[String]) -> CoreResult<Vec<VideoItem>> {
        let listing: VideoListing = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,statistics".to_string()),
                    ("id", video_ids.join(",")),
                ],
            )
            .await?;

        Ok(listing
            .items
            .into_iter()
            .filter_map(VideoResource::into_item)
            .collect())
    }
}

#[async_trait]
impl VideoGateway for HttpVideoGateway {
    async fn trending(&self, region: &str, cursor: Option<String>) -> CoreResult<ResultPage> {
        let mut params = vec![
            ("part", "snippet,statistics".to_string()),
            ("chart", "mostPopular".to_string()),
            ("regionCode", region.to_string()),
            ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
            ("maxResults", self.page_size.to_string()),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }

        let listing: VideoListing = self.get_json("videos", &params).await?;

        Ok(ResultPage {
            items: listing
                .items
                .into_iter()
                .filter_map(VideoResource::into_item)
                .collect(),
            next_cursor: listing.next_page_token,
        })
    }

    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        cursor: Option<String>,
    ) -> CoreResult<ResultPage> {
        let (window_param, window_value) = Self::published_window(filters.is_classic, Utc::now());

        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", Self::compose_query(query, filters)),
            ("regionCode", filters.region_code.clone()),
            ("maxResults", self.page_size.to_string()),
            ("type", "video".to_string()),
            ("videoEmbeddable", "true".to_string()),
            (window_param, window_value),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }

        let listing: SearchListing = self.get_json("search", &params).await?;
        let next_cursor = listing.next_page_token;

        let video_ids: Vec<String> = listing
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();

        if video_ids.is_empty() {
            return Ok(ResultPage::empty());
        }

        let items = self.hydrate_details(&video_ids).await?;
        Ok(ResultPage { items, next_cursor })
    }

    async fn related(&self, video_id: &str) -> CoreResult<Vec<VideoItem>> {
        let listing: SearchListing = self
            .get_json(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("relatedToVideoId", video_id.to_string()),
                    ("type", "video".to_string()),
                    ("maxResults", RELATED_RESULTS.to_string()),
                ],
            )
            .await?;

        Ok(listing
            .items
            .into_iter()
            .filter_map(SearchResource::into_item)
            .collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoListing {
    #[serde(default)]
    items: Vec<VideoResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
}

impl VideoResource {
    fn into_item(self) -> Option<VideoItem> {
        let snippet = self.snippet?;
        Some(VideoItem {
            id: self.id,
            view_count: self
                .statistics
                .and_then(|s| s.view_count)
                .and_then(|v| v.parse().ok()),
            title: snippet.title,
            channel_title: snippet.channel_title,
            thumbnail_url: snippet.thumbnails.best_url(),
            published_at: snippet.published_at,
            description: snippet.description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListing {
    #[serde(default)]
    items: Vec<SearchResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResource {
    id: SearchResourceId,
    snippet: Option<Snippet>,
}

impl SearchResource {
    /// Related-video results carry no statistics; view count stays unset.
    fn into_item(self) -> Option<VideoItem> {
        let id = self.id.video_id?;
        let snippet = self.snippet?;
        Some(VideoItem {
            id,
            title: snippet.title,
            channel_title: snippet.channel_title,
            thumbnail_url: snippet.thumbnails.best_url(),
            published_at: snippet.published_at,
            view_count: None,
            description: snippet.description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    published_at: DateTime<Utc>,
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best_url(self) -> String {
        self.high
            .or(self.default)
            .map(|t| t.url)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

/// Quota signals are surfaced as `RateLimited`; everything else keeps the
/// provider message and becomes `Upstream`.
fn map_provider_error(status: u16, error: ProviderError) -> CoreError {
    let quota_reason = error.errors.iter().any(|d| {
        matches!(
            d.reason.as_str(),
            "quotaExceeded" | "rateLimitExceeded" | "dailyLimitExceeded" | "userRateLimitExceeded"
        )
    });

    let message = if error.message.is_empty() {
        format!("Provider error (HTTP {})", status)
    } else {
        error.message
    };

    if status == 429 || quota_reason {
        CoreError::RateLimited(message)
    } else {
        CoreError::Upstream(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_windows_are_disjoint() {
        let now = Utc::now();
        let (classic_param, classic_value) = HttpVideoGateway::published_window(true, now);
        let (new_param, new_value) = HttpVideoGateway::published_window(false, now);

        assert_eq!(classic_param, "publishedBefore");
        assert_eq!(new_param, "publishedAfter");

        let classic_bound: DateTime<Utc> = classic_value.parse().unwrap();
        let new_bound: DateTime<Utc> = new_value.parse().unwrap();
        // Anything older than 5 years can never fall inside the last year.
        assert!(classic_bound < new_bound);
    }

    #[test]
    fn query_composition_includes_language_hint() {
        let mut filters = SearchFilters::default();
        assert_eq!(
            HttpVideoGateway::compose_query("lofi", &filters),
            "lofi music"
        );

        filters.language = "korean".to_string();
        assert_eq!(
            HttpVideoGateway::compose_query("lofi", &filters),
            "lofi korean music"
        );
    }

    #[test]
    fn quota_errors_map_to_rate_limited() {
        let err = map_provider_error(
            403,
            ProviderError {
                message: "Quota exceeded".to_string(),
                errors: vec![ProviderErrorDetail {
                    reason: "quotaExceeded".to_string(),
                }],
            },
        );
        assert!(matches!(err, CoreError::RateLimited(_)));

        let err = map_provider_error(
            429,
            ProviderError {
                message: String::new(),
                errors: Vec::new(),
            },
        );
        assert!(matches!(err, CoreError::RateLimited(_)));

        let err = map_provider_error(
            400,
            ProviderError {
                message: "Bad request".to_string(),
                errors: Vec::new(),
            },
        );
        assert!(matches!(err, CoreError::Upstream(msg) if msg == "Bad request"));
    }
}
