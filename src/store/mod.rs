/// Social store access
///
/// Row-oriented access to the hosted social backend (posts, comments,
/// likes). The trait is the seam used by the feed paginator and the
/// interaction controller; [`http::RestSocialStore`] talks to the real
/// REST row store.
pub mod http;

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, NewPost, Post};
use crate::error::CoreResult;

pub use http::RestSocialStore;

/// One page of post rows plus the exact total when the store provides one.
#[derive(Debug, Clone)]
pub struct PostBatch {
    pub posts: Vec<Post>,
    pub total: Option<u64>,
}

/// Row-level operations against the social backend.
///
/// The store guarantees per-row atomic insert/delete and read-your-writes
/// for the calling session; nothing here depends on server-side count
/// triggers — counts are computed client-side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Posts in reverse chronological order, offset-paginated.
    async fn list_posts(&self, offset: u32, limit: u32) -> CoreResult<PostBatch>;

    /// Posts by a single author, reverse chronological.
    async fn list_posts_by_author(
        &self,
        author_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> CoreResult<PostBatch>;

    /// Insert a post, returning the stored row with the joined author profile.
    async fn insert_post(&self, author_id: Uuid, new_post: &NewPost) -> CoreResult<Post>;

    /// All comment rows for the given posts, newest first. Unpaginated by
    /// design: the caller tallies per-post counts from the full listing.
    async fn list_comments_for_posts(&self, post_ids: &[Uuid]) -> CoreResult<Vec<Comment>>;

    /// Comments for one post, newest first.
    async fn list_comments(&self, post_id: Uuid) -> CoreResult<Vec<Comment>>;

    /// Insert a comment, returning the stored row (server id and timestamp)
    /// with the joined author profile.
    async fn insert_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> CoreResult<Comment>;

    /// Create the (user, post) like edge.
    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> CoreResult<()>;

    /// Remove the (user, post) like edge by its compound key.
    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> CoreResult<()>;

    /// Which of the given posts the user has liked.
    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> CoreResult<HashSet<Uuid>>;
}
