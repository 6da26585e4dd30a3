use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;

use super::AppState;
use crate::cache::Cached;
use crate::youtube::VideoMetadataError;

const TRENDS_CACHE_CONTROL: &str = "public, s-maxage=300, stale-while-revalidate=600";

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/", get(missing_slug))
        .route("/api/posts/:slug", get(get_post))
        .route("/api/search", get(search))
        .route("/api/categories", get(list_categories))
        .route("/api/trends", get(trends))
        .route("/api/youtube-metadata", post(youtube_metadata))
        .route("/api/revalidate", post(revalidate))
}

async fn health() -> &'static str {
    "OK"
}

// ========== Helpers ==========

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn json_response(body: String, cache_control: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        [(header::CACHE_CONTROL, cache_control.to_string())],
        body,
    )
        .into_response()
}

/// Cache key for a post listing, built from the clamped paging and the
/// category filter only.
fn posts_cache_key(per_page: u32, page: u32, category_slug: Option<&str>) -> String {
    format!(
        "posts:{per_page}:{page}:{}",
        category_slug.unwrap_or_default().to_lowercase()
    )
}

async fn cached_hit(state: &AppState, key: &str) -> Option<Response> {
    let entry = state.cache.get(key).await?;
    tracing::debug!(key = %key, "Response cache hit");
    Some(json_response(entry.body.clone(), &entry.cache_control))
}

/// Serialize a fetched value, remember it under `key`, and respond.
async fn store_and_respond<T: Serialize>(
    state: &AppState,
    key: String,
    cached: Cached<T>,
) -> Response {
    let body = match serde_json::to_string(&cached.value) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to serialize response: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode response");
        }
    };

    let ttl = state.config.cache.ttl(cached.kind);
    state
        .cache
        .insert(
            key,
            body.clone(),
            cached.cache_control.clone(),
            cached.tags,
            ttl,
        )
        .await;

    json_response(body, &cached.cache_control)
}

// ========== WordPress Routes ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsParams {
    per_page: Option<u32>,
    page: Option<u32>,
    category_slug: Option<String>,
}

async fn list_posts(State(state): State<AppState>, Query(params): Query<PostsParams>) -> Response {
    let (per_page, page) = state.wordpress.paging(
        params.per_page.unwrap_or(state.config.default_per_page),
        params.page.unwrap_or(1),
    );
    let category_slug = params
        .category_slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let key = posts_cache_key(per_page, page, category_slug);
    if let Some(hit) = cached_hit(&state, &key).await {
        return hit;
    }

    let result = match category_slug {
        Some(slug) => {
            state
                .wordpress
                .fetch_posts_by_category_slug(slug, per_page, page)
                .await
        }
        _ => state.wordpress.fetch_post_list(per_page, page).await,
    };

    match result {
        Ok(posts) => store_and_respond(&state, key, posts).await,
        Err(e) => {
            tracing::error!(kind = e.kind(), "Failed to fetch posts: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load posts")
        }
    }
}

async fn missing_slug() -> Response {
    error_response(StatusCode::BAD_REQUEST, "Missing slug")
}

async fn get_post(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let slug = slug.trim();
    if slug.is_empty() {
        return missing_slug().await;
    }

    let key = format!("post:{slug}");
    if let Some(hit) = cached_hit(&state, &key).await {
        return hit;
    }

    match state.wordpress.fetch_post_by_slug(slug).await {
        Ok(Some(post)) => store_and_respond(&state, key, post).await,
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Post not found"),
        Err(e) => {
            tracing::error!(slug = %slug, kind = e.kind(), "Failed to fetch post: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load post")
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    q: Option<String>,
    per_page: Option<u32>,
    page: Option<u32>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let query = params.q.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Json(crate::wordpress::SearchResults::default()).into_response();
    }

    let per_page = params.per_page.unwrap_or(state.config.default_per_page);
    let page = params.page.unwrap_or(1);

    let results = state.wordpress.search_posts(query, per_page, page).await;
    Json(results).into_response()
}

async fn list_categories(State(state): State<AppState>) -> Response {
    let key = "categories".to_string();
    if let Some(hit) = cached_hit(&state, &key).await {
        return hit;
    }

    match state.wordpress.fetch_categories().await {
        Ok(categories) => store_and_respond(&state, key, categories).await,
        Err(e) => {
            tracing::error!(kind = e.kind(), "Failed to fetch categories: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load categories")
        }
    }
}

// ========== Widget Routes ==========

async fn trends(State(state): State<AppState>) -> Response {
    let topics = state.trends.get_brazil_trends().await;
    (
        [(header::CACHE_CONTROL, TRENDS_CACHE_CONTROL)],
        Json(topics),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct VideoMetadataRequest {
    #[serde(default)]
    urls: Vec<String>,
}

async fn youtube_metadata(
    State(state): State<AppState>,
    Json(request): Json<VideoMetadataRequest>,
) -> Response {
    if !state.youtube.has_api_key() {
        tracing::error!("YouTube metadata requested but YOUTUBE_API_KEY is not set");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "YouTube API key is not configured",
        );
    }

    match state.youtube.get_video_metadata(request.urls.as_slice()).await {
        Ok(items) => Json(json!({ "items": items })).into_response(),
        Err(VideoMetadataError::MissingApiKey) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "YouTube API key is not configured",
        ),
        Err(VideoMetadataError::Upstream(e)) => {
            tracing::error!(kind = e.kind(), "Failed to fetch video metadata: {e}");
            error_response(StatusCode::BAD_GATEWAY, "Failed to fetch video metadata")
        }
    }
}

// ========== Cache Revalidation ==========

#[derive(Debug, Deserialize)]
struct RevalidateRequest {
    tag: Option<String>,
}

/// Purge cached responses carrying a tag (POST /api/revalidate).
///
/// Requires `Authorization: Bearer <REVALIDATE_SECRET>`. With no secret
/// configured every request is rejected.
async fn revalidate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let authorized = match (state.config.revalidate_secret.as_deref(), provided) {
        (Some(secret), Some(token)) => constant_time_eq(secret.as_bytes(), token.as_bytes()),
        _ => false,
    };
    if !authorized {
        tracing::warn!("Rejected revalidation request with missing or invalid secret");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let tag = serde_json::from_slice::<RevalidateRequest>(&body)
        .ok()
        .and_then(|r| r.tag)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let Some(tag) = tag else {
        return error_response(StatusCode::BAD_REQUEST, "Missing tag");
    };

    let purged = state.cache.invalidate_tag(&tag).await;
    tracing::info!(tag = %tag, purged, "Revalidated cache tag");

    Json(json!({
        "revalidated": true,
        "tag": tag,
        "purged": purged,
        "now": chrono::Utc::now().timestamp_millis(),
    }))
    .into_response()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
