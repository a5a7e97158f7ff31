use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// A normalized video entry as produced by the fetch gateway.
///
/// Immutable once fetched; identity is the provider-assigned `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub thumbnail_url: String,
    pub published_at: DateTime<Utc>,
    pub view_count: Option<u64>,
    pub description: Option<String>,
}

/// Active search filters. A value type; any field change produces a new
/// stream identity and invalidates the result cache for that scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchFilters {
    /// ISO-3166 two-letter region code
    pub region_code: String,
    /// Classic (published > 5 years ago) vs new releases (last year)
    pub is_classic: bool,
    /// Optional language hint appended to the provider query; empty = none
    pub language: String,
}

impl SearchFilters {
    pub fn new(region_code: impl Into<String>) -> Self {
        Self {
            region_code: region_code.into(),
            is_classic: false,
            language: String::new(),
        }
    }
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self::new("US")
    }
}

/// One page of provider results. Item order is the provider rank order and
/// is significant. `next_cursor = None` is terminal for the stream identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    pub items: Vec<VideoItem>,
    pub next_cursor: Option<String>,
}

impl ResultPage {
    /// Terminal empty page (no items, no further pages).
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

/// Public profile fields joined onto posts and comments by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorProfile {
    pub username: String,
    pub avatar_url: Option<String>,
}

impl AuthorProfile {
    /// Placeholder used when the store cannot resolve the profile relation.
    pub fn unknown() -> Self {
        Self {
            username: "Unknown".to_string(),
            avatar_url: None,
        }
    }
}

/// A shared music post. Owned by its author; only the derived counters
/// change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub external_video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    pub author_profile: AuthorProfile,
}

/// Fields required to create a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub external_video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
}

/// A comment on a post. Append-only; never edited or deleted in this core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_profile: AuthorProfile,
}

/// One page of the social feed, reverse chronological by `created_at`.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub offset: u32,
    /// Exact total when the store provides one, otherwise unknown
    pub total: Option<u64>,
}

/// The authenticated caller, as issued by the external session layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: Option<String>,
}

/// Opaque session handle. Absence of a user means every mutating
/// operation fails with `Unauthenticated`.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    current_user: Option<UserIdentity>,
}

impl AuthSession {
    pub fn anonymous() -> Self {
        Self { current_user: None }
    }

    pub fn authenticated(user: UserIdentity) -> Self {
        Self {
            current_user: Some(user),
        }
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.current_user.as_ref()
    }

    /// Returns the signed-in user or rejects with `Unauthenticated`.
    pub fn require_user(&self) -> CoreResult<&UserIdentity> {
        self.current_user.as_ref().ok_or(CoreError::Unauthenticated)
    }
}
