use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tunefeed_core::config::StoreConfig;
use tunefeed_core::domain::NewPost;
use tunefeed_core::error::CoreError;
use tunefeed_core::store::{RestSocialStore, SocialStore};

fn store_for(server: &MockServer) -> RestSocialStore {
    let config = StoreConfig {
        base_url: server.uri(),
        api_key: "service-key".to_string(),
        timeout_secs: 5,
    };
    RestSocialStore::new(&config).unwrap()
}

fn post_row(id: Uuid, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": Uuid::new_v4(),
        "video_id": "vid123",
        "title": title,
        "description": null,
        "thumbnail": "https://thumbs.test/a.jpg",
        "created_at": "2024-05-01T09:30:00Z",
        "likes": 3,
        "profile": { "username": "dj", "avatar_url": null }
    })
}

#[tokio::test]
async fn list_posts_reads_rows_and_exact_total() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/music_posts"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "10"))
        .and(header("apikey", "service-key"))
        .and(header("Prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/42")
                .set_body_json(json!([post_row(id, "First share")])),
        )
        .mount(&server)
        .await;

    let batch = store_for(&server).list_posts(0, 10).await.unwrap();

    assert_eq!(batch.total, Some(42));
    assert_eq!(batch.posts.len(), 1);
    assert_eq!(batch.posts[0].id, id);
    assert_eq!(batch.posts[0].title, "First share");
    assert_eq!(batch.posts[0].like_count, 3);
    assert_eq!(batch.posts[0].author_profile.username, "dj");
    // Comment counts are tallied by the paginator, not the store.
    assert_eq!(batch.posts[0].comment_count, 0);
}

#[tokio::test]
async fn missing_count_header_degrades_total_to_unknown() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/music_posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let batch = store_for(&server).list_posts(0, 10).await.unwrap();
    assert!(batch.total.is_none());
    assert!(batch.posts.is_empty());
}

#[tokio::test]
async fn insert_post_returns_representation_with_profile() {
    let server = MockServer::start().await;
    let author = Uuid::new_v4();
    let stored = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/music_posts"))
        .and(header("Prefer", "return=representation"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([post_row(stored, "Shared")])),
        )
        .mount(&server)
        .await;

    let post = store_for(&server)
        .insert_post(
            author,
            &NewPost {
                external_video_id: "vid123".to_string(),
                title: "Shared".to_string(),
                description: None,
                thumbnail_url: "https://thumbs.test/a.jpg".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(post.id, stored);
    assert_eq!(post.author_profile.username, "dj");
}

#[tokio::test]
async fn insert_comment_returns_server_assigned_identity() {
    let server = MockServer::start().await;
    let comment_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    let author = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/post_comments"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": comment_id,
            "post_id": post_id,
            "user_id": author,
            "content": "great track",
            "created_at": "2024-05-02T10:00:00Z",
            "profile": { "username": "fan", "avatar_url": null }
        }])))
        .mount(&server)
        .await;

    let comment = store_for(&server)
        .insert_comment(author, post_id, "great track")
        .await
        .unwrap();

    assert_eq!(comment.id, comment_id);
    assert_eq!(comment.post_id, post_id);
    assert_eq!(comment.author_profile.username, "fan");
}

#[tokio::test]
async fn delete_like_targets_the_compound_key() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/post_likes"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .and(query_param("post_id", format!("eq.{}", post_id)))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    store_for(&server)
        .delete_like(user_id, post_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn liked_post_ids_collects_edge_rows() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let liked = Uuid::new_v4();
    let other = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/post_likes"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "post_id": liked }])))
        .mount(&server)
        .await;

    let ids = store_for(&server)
        .liked_post_ids(user_id, &[liked, other])
        .await
        .unwrap();

    assert!(ids.contains(&liked));
    assert!(!ids.contains(&other));
}

#[tokio::test]
async fn store_errors_keep_the_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/post_likes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .insert_like(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();

    match err {
        CoreError::Upstream(msg) => {
            assert!(msg.contains("duplicate key value"));
        }
        other => panic!("expected Upstream, got {:?}", other),
    }
}
