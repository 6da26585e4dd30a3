//! In-process response cache with tag-based invalidation.
//!
//! Entries are keyed by the normalized request parameters a handler actually
//! reads, so unrelated query noise maps to the same entry. Each entry carries
//! the cache tags of the data it was built from, so the revalidation webhook
//! can purge every response derived from, say, a single post. The store is
//! bounded; past `max_capacity` the least useful entries are evicted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;

/// A serialized response body held in the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: String,
    pub cache_control: String,
    pub tags: Vec<String>,
    ttl: Duration,
}

impl CachedResponse {
    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Each entry expires after its own resource TTL.
struct EntryTtl;

impl Expiry<String, Arc<CachedResponse>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CachedResponse>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Response cache shared by all request handlers.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Arc<CachedResponse>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryTtl)
                .build(),
        }
    }

    /// Look up a fresh entry. Expired entries are treated as misses.
    pub async fn get(&self, key: &str) -> Option<Arc<CachedResponse>> {
        self.entries.get(key).await
    }

    /// Store a response. A zero TTL means the response is never stored.
    pub async fn insert(
        &self,
        key: impl Into<String>,
        body: String,
        cache_control: String,
        tags: Vec<String>,
        ttl: Duration,
    ) {
        if ttl.is_zero() {
            return;
        }

        let entry = CachedResponse {
            body,
            cache_control,
            tags,
            ttl,
        };
        self.entries.insert(key.into(), Arc::new(entry)).await;
    }

    /// Drop every entry carrying `tag`. Returns how many were removed.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let keys: Vec<Arc<String>> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.has_tag(tag))
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            self.entries.invalidate(key.as_str()).await;
        }
        keys.len()
    }

    /// Number of live entries, after pending evictions have been applied.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
