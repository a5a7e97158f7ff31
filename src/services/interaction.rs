use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{AuthSession, Comment, Post};
use crate::error::{CoreError, CoreResult};
use crate::store::SocialStore;

/// Per-post interaction state the UI binds to.
#[derive(Debug, Clone, Default)]
pub struct PostInteraction {
    pub liked: bool,
    pub like_count: i64,
    pub pending_like: bool,
    pub comments: Vec<Comment>,
    pub pending_comment: bool,
}

/// Result of a like toggle.
#[derive(Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The optimistic mutation was confirmed by the store.
    Committed { liked: bool, like_count: i64 },
    /// A toggle for this post was already in flight; nothing was queued
    /// and no remote write was attempted.
    Debounced,
}

/// Optimistic like/comment mutations against individual posts.
///
/// Like toggles are two-phase: the local state is mutated immediately, the
/// remote write follows, and a failed write rolls the local state back to
/// its exact prior values. Comments are the opposite: nothing is inserted
/// locally until the store confirms the row, because comment identity
/// (id, timestamp) is server-assigned.
pub struct InteractionController {
    store: Arc<dyn SocialStore>,
    states: HashMap<Uuid, PostInteraction>,
}

impl InteractionController {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self {
            store,
            states: HashMap::new(),
        }
    }

    /// Begin tracking a post, seeding the like count from the stored row.
    /// Tracking an already-tracked post keeps the live state.
    pub fn track(&mut self, post: &Post) {
        self.states
            .entry(post.id)
            .or_insert_with(|| PostInteraction {
                like_count: post.like_count,
                ..PostInteraction::default()
            });
    }

    pub fn state(&self, post_id: Uuid) -> Option<&PostInteraction> {
        self.states.get(&post_id)
    }

    /// Seed `liked` flags for the given posts from the user's stored like
    /// edges. A no-op for anonymous sessions.
    pub async fn hydrate_likes(
        &mut self,
        session: &AuthSession,
        post_ids: &[Uuid],
    ) -> CoreResult<()> {
        let Some(user) = session.current_user() else {
            return Ok(());
        };

        let liked = self.store.liked_post_ids(user.id, post_ids).await?;
        for post_id in post_ids {
            if let Some(state) = self.states.get_mut(post_id) {
                state.liked = liked.contains(post_id);
            }
        }
        Ok(())
    }

    /// Load the comment thread for a post, newest first.
    pub async fn load_comments(&mut self, post_id: Uuid) -> CoreResult<()> {
        let comments = self.store.list_comments(post_id).await?;
        let state = self.tracked_mut(post_id)?;
        state.comments = comments;
        Ok(())
    }

    /// Flip the like edge for a post, optimistically.
    ///
    /// The flip is applied locally before the remote write; on failure both
    /// `liked` and `like_count` revert to their pre-call values and the
    /// error is surfaced once. A second toggle while one is pending is
    /// debounced, protecting the single like edge from duplicate or
    /// inverted writes.
    pub async fn toggle_like(
        &mut self,
        session: &AuthSession,
        post_id: Uuid,
    ) -> CoreResult<ToggleOutcome> {
        let user_id = session.require_user()?.id;

        let state = self.tracked_mut(post_id)?;
        if state.pending_like {
            tracing::debug!(%post_id, "Like toggle already in flight, debouncing");
            return Ok(ToggleOutcome::Debounced);
        }

        let liked_before = state.liked;
        let count_before = state.like_count;

        state.pending_like = true;
        state.liked = !liked_before;
        state.like_count = if state.liked {
            count_before + 1
        } else {
            (count_before - 1).max(0)
        };
        let now_liked = state.liked;

        let result = if now_liked {
            self.store.insert_like(user_id, post_id).await
        } else {
            self.store.delete_like(user_id, post_id).await
        };

        let state = self
            .states
            .get_mut(&post_id)
            .expect("tracked state vanished during toggle");
        state.pending_like = false;

        match result {
            Ok(()) => Ok(ToggleOutcome::Committed {
                liked: state.liked,
                like_count: state.like_count,
            }),
            Err(err) => {
                tracing::warn!(%post_id, error = %err, "Like write failed, rolling back");
                state.liked = liked_before;
                state.like_count = count_before;
                Err(err)
            }
        }
    }

    /// Post a comment. The input is validated before any network call and
    /// the server-confirmed comment is prepended on success; on failure the
    /// thread is left unchanged so the caller can resubmit the input.
    pub async fn post_comment(
        &mut self,
        session: &AuthSession,
        post_id: Uuid,
        content: &str,
    ) -> CoreResult<Comment> {
        let user_id = session.require_user()?.id;

        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::InvalidInput("Comment is empty".to_string()));
        }

        let state = self.tracked_mut(post_id)?;
        state.pending_comment = true;

        let result = self.store.insert_comment(user_id, post_id, content).await;

        let state = self
            .states
            .get_mut(&post_id)
            .expect("tracked state vanished during comment");
        state.pending_comment = false;

        match result {
            Ok(comment) => {
                state.comments.insert(0, comment.clone());
                Ok(comment)
            }
            Err(err) => {
                tracing::warn!(%post_id, error = %err, "Comment write failed");
                Err(err)
            }
        }
    }

    fn tracked_mut(&mut self, post_id: Uuid) -> CoreResult<&mut PostInteraction> {
        self.states
            .get_mut(&post_id)
            .ok_or_else(|| CoreError::InvalidInput(format!("Post {} is not tracked", post_id)))
    }
}
