use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::{AuthorProfile, Comment, NewPost, Post};
use crate::error::{CoreError, CoreResult};
use crate::store::{PostBatch, SocialStore};

const POSTS_TABLE: &str = "music_posts";
const COMMENTS_TABLE: &str = "post_comments";
const LIKES_TABLE: &str = "post_likes";

const POST_SELECT: &str = "*,profile:profiles(username,avatar_url)";
const COMMENT_SELECT: &str = "*,profile:profiles(username,avatar_url)";

/// REST client for the hosted row store (PostgREST dialect).
///
/// Exact totals come from `Prefer: count=exact` + the `Content-Range`
/// response header; inserts use `Prefer: return=representation` so the
/// stored row comes back with the joined author profile.
#[derive(Clone)]
pub struct RestSocialStore {
    http: reqwest::Client,
    base_url: String,
}

impl RestSocialStore {
    pub fn new(config: &StoreConfig) -> CoreResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| CoreError::Config("Invalid social store API key".to_string()))?;
        headers.insert("apikey", key);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn fetch_posts(&self, filters: &[(&str, String)], offset: u32, limit: u32) -> CoreResult<PostBatch> {
        let mut params = vec![
            ("select", POST_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ];
        params.extend(filters.iter().cloned());

        let response = self
            .http
            .get(self.table_url(POSTS_TABLE))
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let rows: Vec<PostRow> = read_rows(response).await?;
        Ok(PostBatch {
            posts: rows.into_iter().map(PostRow::into_post).collect(),
            total,
        })
    }
}

#[async_trait]
impl SocialStore for RestSocialStore {
    async fn list_posts(&self, offset: u32, limit: u32) -> CoreResult<PostBatch> {
        self.fetch_posts(&[], offset, limit).await
    }

    async fn list_posts_by_author(
        &self,
        author_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> CoreResult<PostBatch> {
        self.fetch_posts(&[("user_id", format!("eq.{}", author_id))], offset, limit)
            .await
    }

    async fn insert_post(&self, author_id: Uuid, new_post: &NewPost) -> CoreResult<Post> {
        let response = self
            .http
            .post(self.table_url(POSTS_TABLE))
            .query(&[("select", POST_SELECT)])
            .header("Prefer", "return=representation")
            .json(&InsertPostRow {
                user_id: author_id,
                video_id: &new_post.external_video_id,
                title: &new_post.title,
                description: new_post.description.as_deref(),
                thumbnail: &new_post.thumbnail_url,
            })
            .send()
            .await?;

        let rows: Vec<PostRow> = read_rows(response).await?;
        rows.into_iter()
            .next()
            .map(PostRow::into_post)
            .ok_or_else(|| CoreError::Upstream("Store returned no inserted post row".to_string()))
    }

    async fn list_comments_for_posts(&self, post_ids: &[Uuid]) -> CoreResult<Vec<Comment>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = post_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .http
            .get(self.table_url(COMMENTS_TABLE))
            .query(&[
                ("select", COMMENT_SELECT.to_string()),
                ("post_id", format!("in.({})", id_list)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<CommentRow> = read_rows(response).await?;
        Ok(rows.into_iter().map(CommentRow::into_comment).collect())
    }

    async fn list_comments(&self, post_id: Uuid) -> CoreResult<Vec<Comment>> {
        let response = self
            .http
            .get(self.table_url(COMMENTS_TABLE))
            .query(&[
                ("select", COMMENT_SELECT.to_string()),
                ("post_id", format!("eq.{}", post_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<CommentRow> = read_rows(response).await?;
        Ok(rows.into_iter().map(CommentRow::into_comment).collect())
    }

    async fn insert_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> CoreResult<Comment> {
        let response = self
            .http
            .post(self.table_url(COMMENTS_TABLE))
            .query(&[("select", COMMENT_SELECT)])
            .header("Prefer", "return=representation")
            .json(&InsertCommentRow {
                user_id: author_id,
                post_id,
                content,
            })
            .send()
            .await?;

        let rows: Vec<CommentRow> = read_rows(response).await?;
        rows.into_iter()
            .next()
            .map(CommentRow::into_comment)
            .ok_or_else(|| {
                CoreError::Upstream("Store returned no inserted comment row".to_string())
            })
    }

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> CoreResult<()> {
        let response = self
            .http
            .post(self.table_url(LIKES_TABLE))
            .json(&InsertLikeRow { user_id, post_id })
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> CoreResult<()> {
        let response = self
            .http
            .delete(self.table_url(LIKES_TABLE))
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("post_id", format!("eq.{}", post_id)),
            ])
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> CoreResult<HashSet<Uuid>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let id_list = post_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .http
            .get(self.table_url(LIKES_TABLE))
            .query(&[
                ("select", "post_id".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("post_id", format!("in.({})", id_list)),
            ])
            .send()
            .await?;

        let rows: Vec<LikeIdRow> = read_rows(response).await?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }
}

/// Reject non-2xx responses, keeping the store's error message.
async fn check_status(response: reqwest::Response) -> CoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<StoreErrorBody>(&body)
        .ok()
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Store returned HTTP {}", status));

    if status.as_u16() == 429 {
        Err(CoreError::RateLimited(message))
    } else {
        Err(CoreError::Upstream(message))
    }
}

async fn read_rows<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> CoreResult<Vec<T>> {
    let response = check_status(response).await?;
    response
        .json::<Vec<T>>()
        .await
        .map_err(|e| CoreError::Upstream(format!("Malformed store response: {}", e)))
}

/// Total from a `Content-Range` header of the form `0-9/57` or `*/57`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let total = value.rsplit('/').next()?;
    total.parse().ok()
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Deserialize)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    video_id: String,
    title: String,
    description: Option<String>,
    thumbnail: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    likes: i64,
    profile: Option<ProfileRow>,
}

impl PostRow {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            author_id: self.user_id,
            external_video_id: self.video_id,
            title: self.title,
            description: self.description,
            thumbnail_url: self.thumbnail,
            created_at: self.created_at,
            like_count: self.likes.max(0),
            // Tallied client-side by the feed paginator
            comment_count: 0,
            author_profile: self
                .profile
                .map(ProfileRow::into_profile)
                .unwrap_or_else(AuthorProfile::unknown),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    profile: Option<ProfileRow>,
}

impl CommentRow {
    fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            post_id: self.post_id,
            author_id: self.user_id,
            content: self.content,
            created_at: self.created_at,
            author_profile: self
                .profile
                .map(ProfileRow::into_profile)
                .unwrap_or_else(AuthorProfile::unknown),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    username: Option<String>,
    avatar_url: Option<String>,
}

impl ProfileRow {
    fn into_profile(self) -> AuthorProfile {
        AuthorProfile {
            username: self.username.unwrap_or_else(|| "Unknown".to_string()),
            avatar_url: self.avatar_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct InsertPostRow<'a> {
    user_id: Uuid,
    video_id: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    thumbnail: &'a str,
}

#[derive(Debug, Serialize)]
struct InsertCommentRow<'a> {
    user_id: Uuid,
    post_id: Uuid,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct InsertLikeRow {
    user_id: Uuid,
    post_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct LikeIdRow {
    post_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total_parses_both_forms() {
        assert_eq!(parse_content_range_total("0-9/57"), Some(57));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }
}
