//! Integration tests for web routes.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use news_content_gateway::config::Config;
use news_content_gateway::web::{create_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "s3cret-webhook";

fn test_config(server: &MockServer) -> Config {
    Config {
        wordpress_api_url: format!("{}/wp-json", server.uri()),
        trends_api_url: format!("{}/trends", server.uri()),
        trends_scrape_url: format!("{}/brazil/", server.uri()),
        youtube_api_url: format!("{}/youtube/v3", server.uri()),
        fallback_timeout: Duration::from_millis(500),
        revalidate_secret: Some(SECRET.to_string()),
        ..Config::for_testing()
    }
}

fn create_test_app(config: Config) -> Router {
    create_app(AppState::new(config).expect("Failed to build state"))
}

fn post_json(id: u64, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "date": "2024-05-01T09:00:00",
        "title": {"rendered": format!("Post {id}")},
        "_embedded": {"wp:term": [[{"name": "Brasil", "slug": "brasil"}]]}
    })
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(
    app: &Router,
    uri: &str,
    auth: Option<&str>,
    body: &Value,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let app = create_test_app(test_config(&server));

    let response = get(&app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_posts_list_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("per_page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([post_json(2, "b"), post_json(1, "a")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));

    for _ in 0..2 {
        let response = get(&app, "/api/posts?perPage=2&page=1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, s-maxage=3600"
        );
        let posts = body_json(response).await;
        assert_eq!(posts.as_array().unwrap().len(), 2);
        assert_eq!(posts[0]["categories_names"], json!(["Brasil"]));
        assert_eq!(posts[0]["categories_slugs"], json!(["brasil"]));
    }
}

#[tokio::test]
async fn test_unused_query_params_share_one_cache_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json(1, "a")])))
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::new(test_config(&server)).expect("Failed to build state");
    let app = create_app(state.clone());

    for i in 0..25 {
        let response = get(&app, &format!("/api/posts?junk={i}")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = get(&app, "/api/posts?page=1&perPage=10").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(state.cache.len().await, 1);
}

#[tokio::test]
async fn test_posts_list_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream detail"))
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));
    let response = get(&app, "/api/posts").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to load posts");
}

#[tokio::test]
async fn test_unknown_category_slug_gives_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));
    let response = get(&app, "/api/posts?categorySlug=zzz-nonexistent-zzz").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_single_post_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "eleicoes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json(3, "eleicoes")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));

    let response = get(&app, "/api/posts/eleicoes").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], 3);

    let response = get(&app, "/api/posts/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&app, "/api/posts/%20").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/posts/").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("search", "copa"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-WP-Total", "1")
                .insert_header("X-WP-TotalPages", "1")
                .set_body_json(json!([post_json(5, "copa")])),
        )
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));

    let body = body_json(get(&app, "/api/search?q=copa").await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["posts"][0]["slug"], "copa");

    let body = body_json(get(&app, "/api/search?q=").await).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_revalidate_auth_and_validation() {
    let server = MockServer::start().await;
    let app = create_test_app(test_config(&server));
    let tag = json!({"tag": "posts"});

    let response = post(&app, "/api/revalidate", None, &tag).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post(&app, "/api/revalidate", Some("Bearer wrong"), &tag).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let auth = format!("Bearer {SECRET}");
    let response = post(&app, "/api/revalidate", Some(&auth), &json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(&app, "/api/revalidate", Some(&auth), &tag).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["revalidated"], true);
    assert_eq!(body["tag"], "posts");
}

#[tokio::test]
async fn test_revalidate_without_configured_secret() {
    let server = MockServer::start().await;
    let config = Config {
        revalidate_secret: None,
        ..test_config(&server)
    };
    let app = create_test_app(config);

    let response = post(&app, "/api/revalidate", Some("Bearer "), &json!({"tag": "posts"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revalidate_purges_cached_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json(1, "a")])))
        .expect(2)
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));

    assert_eq!(get(&app, "/api/posts").await.status(), StatusCode::OK);
    assert_eq!(get(&app, "/api/posts").await.status(), StatusCode::OK);

    let auth = format!("Bearer {SECRET}");
    let response = post(&app, "/api/revalidate", Some(&auth), &json!({"tag": "posts"})).await;
    assert_eq!(body_json(response).await["purged"], 1);

    assert_eq!(get(&app, "/api/posts").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trends_route_always_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = create_test_app(test_config(&server));
    let response = get(&app, "/api/trends").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, s-maxage=300, stale-while-revalidate=600"
    );
    let topics = body_json(response).await;
    assert!(topics.as_array().unwrap().len() >= 5);
    assert!(topics[0]["tag"].is_string());
    assert!(topics[0]["tweets"].is_string());
}

#[tokio::test]
async fn test_youtube_metadata_without_key() {
    let server = MockServer::start().await;
    let app = create_test_app(test_config(&server));

    let response = post(
        &app,
        "/api/youtube-metadata",
        None,
        &json!({"urls": ["https://youtu.be/abc123"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_youtube_metadata_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "abc123",
                "snippet": {"title": "Jornal", "thumbnails": {"high": {"url": "https://i.ytimg.com/hq.jpg"}}},
                "statistics": {"viewCount": "77"},
                "contentDetails": {"duration": "PT5M9S"}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "broken1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = Config {
        youtube_api_key: Some("test-key".to_string()),
        ..test_config(&server)
    };
    let app = create_test_app(config);

    let response = post(
        &app,
        "/api/youtube-metadata",
        None,
        &json!({"urls": ["https://www.youtube.com/watch?v=abc123", "https://example.com"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["items"]["abc123"]["duration"], "5:09");
    assert_eq!(body["items"]["abc123"]["viewCount"], 77);
    assert_eq!(body["items"]["abc123"]["thumbnail"], "https://i.ytimg.com/hq.jpg");

    let response = post(
        &app,
        "/api/youtube-metadata",
        None,
        &json!({"urls": ["https://youtu.be/broken1"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
