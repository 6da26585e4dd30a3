//! Cache policy for WordPress-backed responses.
//!
//! `CacheSpec` maps each kind of WordPress resource to a TTL. Handlers turn
//! that TTL into a `Cache-Control` directive and into an expiry for the
//! in-process [`ResponseCache`].

mod response_cache;

use std::fmt;
use std::time::Duration;

pub use response_cache::{CachedResponse, ResponseCache};

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Kinds of WordPress resources with their own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    PostsList,
    Post,
    Categories,
    Tags,
    Media,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::PostsList,
        ResourceKind::Post,
        ResourceKind::Categories,
        ResourceKind::Tags,
        ResourceKind::Media,
    ];

    /// Suffix used for the `CACHE_TTL_<KIND>_MS` override variable.
    #[must_use]
    pub const fn env_suffix(self) -> &'static str {
        match self {
            Self::PostsList => "POSTS_LIST",
            Self::Post => "POST",
            Self::Categories => "CATEGORIES",
            Self::Tags => "TAGS",
            Self::Media => "MEDIA",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_suffix())
    }
}

/// TTL per resource kind, in milliseconds. Zero means "do not cache".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSpec {
    pub posts_list_ms: u64,
    pub post_ms: u64,
    pub categories_ms: u64,
    pub tags_ms: u64,
    pub media_ms: u64,
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            posts_list_ms: HOUR_MS,
            post_ms: HOUR_MS,
            categories_ms: DAY_MS,
            tags_ms: DAY_MS,
            media_ms: 7 * DAY_MS,
        }
    }
}

impl CacheSpec {
    /// A table that disables caching for every kind.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            posts_list_ms: 0,
            post_ms: 0,
            categories_ms: 0,
            tags_ms: 0,
            media_ms: 0,
        }
    }

    #[must_use]
    pub const fn ttl_ms(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::PostsList => self.posts_list_ms,
            ResourceKind::Post => self.post_ms,
            ResourceKind::Categories => self.categories_ms,
            ResourceKind::Tags => self.tags_ms,
            ResourceKind::Media => self.media_ms,
        }
    }

    pub fn set_ttl_ms(&mut self, kind: ResourceKind, ttl_ms: u64) {
        let slot = match kind {
            ResourceKind::PostsList => &mut self.posts_list_ms,
            ResourceKind::Post => &mut self.post_ms,
            ResourceKind::Categories => &mut self.categories_ms,
            ResourceKind::Tags => &mut self.tags_ms,
            ResourceKind::Media => &mut self.media_ms,
        };
        *slot = ttl_ms;
    }

    #[must_use]
    pub const fn ttl(&self, kind: ResourceKind) -> Duration {
        Duration::from_millis(self.ttl_ms(kind))
    }

    /// `Cache-Control` directive for responses built from this kind.
    #[must_use]
    pub fn cache_control(&self, kind: ResourceKind) -> String {
        cache_control_for_ttl_ms(self.ttl_ms(kind))
    }
}

/// Derive a `Cache-Control` directive from a TTL in milliseconds.
///
/// A zero TTL yields `no-store`. Sub-second TTLs round up to one second so a
/// non-zero TTL never turns into `s-maxage=0`.
#[must_use]
pub fn cache_control_for_ttl_ms(ttl_ms: u64) -> String {
    if ttl_ms == 0 {
        return "no-store".to_string();
    }
    let secs = ttl_ms.div_ceil(1000);
    format!("public, s-maxage={secs}")
}

/// A value fetched from WordPress together with its cache metadata.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub kind: ResourceKind,
    pub cache_control: String,
    pub tags: Vec<String>,
}

impl<T> Cached<T> {
    pub fn new(value: T, kind: ResourceKind, spec: &CacheSpec, tags: Vec<String>) -> Self {
        Self {
            value,
            kind,
            cache_control: spec.cache_control(kind),
            tags,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Cached<U> {
        Cached {
            value: f(self.value),
            kind: self.kind,
            cache_control: self.cache_control,
            tags: self.tags,
        }
    }
}

/// Cache tag helpers shared by the client and the revalidation webhook.
pub mod tags {
    pub const POSTS: &str = "posts";
    pub const CATEGORIES: &str = "categories";

    #[must_use]
    pub fn post(slug: &str) -> String {
        format!("post:{slug}")
    }

    #[must_use]
    pub fn category(slug: &str) -> String {
        format!("category:{slug}")
    }
}
