use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{AuthSession, FeedPage, NewPost, Post};
use crate::error::CoreResult;
use crate::store::SocialStore;

const DEFAULT_PAGE_SIZE: u32 = 10;

/// Offset-paginated view over the shared-post feed.
///
/// The backing store has no reliable comment aggregate, so every fetched
/// window is enriched by a secondary read of the comment rows for exactly
/// those posts, tallied client-side per post id. Counts are therefore exact
/// for loaded posts and absent for posts never fetched.
pub struct SocialFeedPaginator {
    store: Arc<dyn SocialStore>,
    posts: Vec<Post>,
    total: Option<u64>,
    has_more: bool,
    page_size: u32,
}

impl SocialFeedPaginator {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<dyn SocialStore>, page_size: u32) -> Self {
        Self {
            store,
            posts: Vec::new(),
            total: None,
            has_more: true,
            page_size,
        }
    }

    /// Reload from the top, replacing the cached feed.
    pub async fn refresh(&mut self) -> CoreResult<FeedPage> {
        self.load_page(0, self.page_size).await
    }

    /// Fetch one window. Offset 0 replaces the cache; any other offset
    /// appends. A fetch error leaves the cached feed untouched.
    pub async fn load_page(&mut self, offset: u32, limit: u32) -> CoreResult<FeedPage> {
        let batch = self.store.list_posts(offset, limit).await?;
        let mut page_posts = batch.posts;
        self.enrich_comment_counts(&mut page_posts).await?;

        let returned = page_posts.len() as u32;
        self.total = batch.total;
        self.has_more = match batch.total {
            Some(total) => u64::from(offset + returned) < total,
            // Degraded: no exact count available; a full page suggests more.
            None => returned == limit,
        };

        if offset == 0 {
            self.posts = page_posts.clone();
        } else {
            self.posts.extend(page_posts.iter().cloned());
        }

        Ok(FeedPage {
            posts: page_posts,
            offset,
            total: batch.total,
        })
    }

    /// Fetch the window after the currently loaded posts. Performs no
    /// network call once the feed is known to be complete.
    pub async fn load_more(&mut self) -> CoreResult<FeedPage> {
        let offset = self.posts.len() as u32;
        if !self.has_more {
            return Ok(FeedPage {
                posts: Vec::new(),
                offset,
                total: self.total,
            });
        }
        self.load_page(offset, self.page_size).await
    }

    /// Share a video as a new post. The stored row (with joined author
    /// profile) is prepended to the local feed.
    pub async fn create_post(&mut self, session: &AuthSession, new_post: NewPost) -> CoreResult<Post> {
        let user = session.require_user()?;
        let post = self.store.insert_post(user.id, &new_post).await?;

        self.posts.insert(0, post.clone());
        if let Some(total) = self.total.as_mut() {
            *total += 1;
        }

        Ok(post)
    }

    /// One window of a single author's posts. Stateless: does not touch the
    /// cached feed.
    pub async fn user_posts(
        &self,
        author_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> CoreResult<FeedPage> {
        let batch = self
            .store
            .list_posts_by_author(author_id, offset, limit)
            .await?;
        let mut posts = batch.posts;
        self.enrich_comment_counts(&mut posts).await?;

        Ok(FeedPage {
            posts,
            offset,
            total: batch.total,
        })
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    async fn enrich_comment_counts(&self, posts: &mut [Post]) -> CoreResult<()> {
        if posts.is_empty() {
            return Ok(());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let comments = self.store.list_comments_for_posts(&post_ids).await?;

        let mut tally: HashMap<Uuid, i64> = HashMap::new();
        for comment in &comments {
            *tally.entry(comment.post_id).or_insert(0) += 1;
        }

        for post in posts.iter_mut() {
            post.comment_count = tally.get(&post.id).copied().unwrap_or(0);
        }

        Ok(())
    }
}
