//! YouTube video metadata enrichment.
//!
//! Unlike trends, this has no static fallback: a missing API key is a hard
//! error for the caller, since metadata is fetched on demand for a catalog
//! rather than to keep a widget alive.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::constants::CLIENT_USER_AGENT;
use crate::upstream::{self, UpstreamError};

/// Thumbnail variants, best first.
const THUMBNAIL_PREFERENCE: [&str; 5] = ["maxres", "standard", "high", "medium", "default"];

/// The `videos` endpoint rejects larger `id` lists.
const MAX_IDS_PER_REQUEST: usize = 50;

static ISO8601_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").unwrap()
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

#[derive(Debug, Error)]
pub enum VideoMetadataError {
    #[error("YouTube API key is not configured")]
    MissingApiKey,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Enrichment data for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub view_count: u64,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnails: BTreeMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

impl From<VideoItem> for VideoMetadata {
    fn from(item: VideoItem) -> Self {
        Self {
            thumbnail: pick_thumbnail(&item.snippet.thumbnails),
            duration: format_iso8601_duration(item.content_details.duration.as_deref().unwrap_or("")),
            view_count: item
                .statistics
                .view_count
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            title: item.snippet.title,
            id: item.id,
        }
    }
}

/// Client for the YouTube Data API `videos` endpoint.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    /// Create a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.youtube_timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_url: config.youtube_api_url.clone(),
            api_key: config.youtube_api_key.clone(),
        })
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch metadata for every YouTube video referenced in `urls`.
    ///
    /// URLs without a recognizable video id are dropped and duplicate ids are
    /// requested once. When no id survives, no request is made.
    ///
    /// # Errors
    ///
    /// Returns [`VideoMetadataError::MissingApiKey`] when ids are present but
    /// no key is configured, or an upstream error if the API call fails.
    pub async fn get_video_metadata<S: AsRef<str>>(
        &self,
        urls: &[S],
    ) -> Result<BTreeMap<String, VideoMetadata>, VideoMetadataError> {
        let ids = unique_video_ids(urls);
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VideoMetadataError::MissingApiKey)?;

        let mut items = BTreeMap::new();
        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let request = self
                .client
                .get(format!("{}/videos", self.api_url))
                .query(&[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", chunk.join(",").as_str()),
                    ("key", api_key),
                ]);

            let response: VideosResponse = upstream::send(&self.client, request).await?.json()?;
            debug!(requested = chunk.len(), returned = response.items.len(), "Fetched video metadata");

            items.extend(
                response
                    .items
                    .into_iter()
                    .map(VideoMetadata::from)
                    .map(|meta| (meta.id.clone(), meta)),
            );
        }

        Ok(items)
    }
}

/// Extract a video id from the three known YouTube URL shapes:
/// `youtu.be/<id>`, `youtube.com/watch?v=<id>` and `youtube.com/embed/<id>`.
#[must_use]
pub fn extract_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(ToString::to_string),
        "youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") => segments.next().map(ToString::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    VIDEO_ID.is_match(&candidate).then_some(candidate)
}

/// Extract ids from `urls`, dropping misses and duplicates in first-seen order.
#[must_use]
pub fn unique_video_ids<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter_map(|u| extract_video_id(u.as_ref()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Format an ISO-8601 duration (`PT1H2M3S`) as `H:MM:SS` or `M:SS`.
///
/// Empty or malformed input yields `0:00`.
#[must_use]
pub fn format_iso8601_duration(input: &str) -> String {
    let Some(caps) = ISO8601_DURATION.captures(input.trim()) else {
        return "0:00".to_string();
    };

    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, seconds) = (part(1), part(2), part(3));

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

fn pick_thumbnail(thumbnails: &BTreeMap<String, Thumbnail>) -> String {
    THUMBNAIL_PREFERENCE
        .iter()
        .filter_map(|key| thumbnails.get(*key))
        .map(|t| t.url.clone())
        .find(|url| !url.is_empty())
        .unwrap_or_default()
}
