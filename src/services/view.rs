use crate::domain::Post;
use crate::services::interaction::PostInteraction;

/// Rendered view model for one feed post.
///
/// This is the contract the feed assembler (UI glue) consumes: stored
/// counts merged with live interaction state, where the interaction state
/// wins whenever the post is tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub post: Post,
    pub liked: bool,
    pub like_count: i64,
    pub comment_count: i64,
    pub like_pending: bool,
    pub comment_pending: bool,
}

impl PostView {
    pub fn compose(post: &Post, interaction: Option<&PostInteraction>) -> Self {
        match interaction {
            Some(state) => Self {
                post: post.clone(),
                liked: state.liked,
                like_count: state.like_count,
                // The loaded thread is the freshest count we have; fall back
                // to the paginator's tally before the thread is opened.
                comment_count: if state.comments.is_empty() {
                    post.comment_count
                } else {
                    state.comments.len() as i64
                },
                like_pending: state.pending_like,
                comment_pending: state.pending_comment,
            },
            None => Self {
                post: post.clone(),
                liked: false,
                like_count: post.like_count,
                comment_count: post.comment_count,
                like_pending: false,
                comment_pending: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthorProfile;
    use chrono::Utc;
    use uuid::Uuid;

    fn post() -> Post {
        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            external_video_id: "vid".to_string(),
            title: "title".to_string(),
            description: None,
            thumbnail_url: "https://thumbs.test/a.jpg".to_string(),
            created_at: Utc::now(),
            like_count: 4,
            comment_count: 2,
            author_profile: AuthorProfile::unknown(),
        }
    }

    #[test]
    fn untracked_post_renders_stored_counts() {
        let post = post();
        let view = PostView::compose(&post, None);

        assert!(!view.liked);
        assert_eq!(view.like_count, 4);
        assert_eq!(view.comment_count, 2);
    }

    #[test]
    fn tracked_post_prefers_interaction_state() {
        let post = post();
        let state = PostInteraction {
            liked: true,
            like_count: 5,
            pending_like: true,
            comments: Vec::new(),
            pending_comment: false,
        };

        let view = PostView::compose(&post, Some(&state));
        assert!(view.liked);
        assert_eq!(view.like_count, 5);
        assert!(view.like_pending);
        // Thread not loaded yet: the paginator tally stands.
        assert_eq!(view.comment_count, 2);
    }
}
