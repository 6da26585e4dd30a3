//! Trending topics for Brazil.
//!
//! Resolved through a [`FallbackChain`]: the trends API (when a bearer token
//! is configured), then a scrape of a public trends page, then a fixed list.
//! The widget always gets something to render.

mod sources;

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

pub use sources::{parse_api_trends, parse_scraped_trends, TrendsApiSource, TrendsScrapeSource};

use crate::config::Config;
use crate::fallback::{FallbackChain, Resolved, Source};

/// Fewest topics a source must return to be used.
pub const MIN_TOPICS: usize = 5;
/// Topics kept from the trends API.
pub const MAX_API_TOPICS: usize = 7;
/// Topics kept from the scrape.
pub const MAX_SCRAPED_TOPICS: usize = 10;

/// Popularity shown when a source has no count.
pub const UNKNOWN_COUNT: &str = "N/A";

/// One trending tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub tag: String,
    /// Human-readable popularity: `999`, `1.5K`, `2.3M` or `N/A`.
    pub tweets: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TrendingTopic {
    #[must_use]
    pub fn new(tag: impl Into<String>, tweets: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            url: search_url(&tag),
            tag,
            tweets: tweets.into(),
            category: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Search URL for a tag.
#[must_use]
pub fn search_url(tag: &str) -> String {
    format!("https://x.com/search?q={}", urlencoding::encode(tag))
}

/// Format a popularity count as `N`, `N.NK` or `N.NM`.
///
/// Zero and missing counts are shown as `N/A`.
#[must_use]
pub fn format_count(count: Option<u64>) -> String {
    match count {
        None | Some(0) => UNKNOWN_COUNT.to_string(),
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
    }
}

/// The list served when every upstream source fails.
#[must_use]
pub fn static_trends() -> Vec<TrendingTopic> {
    [
        ("Lula", "125.4K", "Política"),
        ("#Brasileirão", "98.2K", "Esportes"),
        ("Flamengo", "76.1K", "Esportes"),
        ("Reforma Tributária", "45.3K", "Economia"),
        ("#Enem", "38.9K", "Educação"),
        ("Dólar", "22.7K", "Economia"),
        ("São Paulo", "18.5K", "Cidades"),
    ]
    .into_iter()
    .map(|(tag, tweets, category)| TrendingTopic::new(tag, tweets).with_category(category))
    .collect()
}

#[derive(Debug, Clone)]
struct CachedTrends {
    topics: Vec<TrendingTopic>,
    fetched_at: Instant,
}

/// Trending topics with a fixed refresh interval.
pub struct TrendsService {
    chain: FallbackChain<Vec<TrendingTopic>>,
    cache: RwLock<Option<CachedTrends>>,
    refresh_interval: Duration,
}

impl TrendsService {
    /// Build the standard chain: trends API, then scrape.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.fallback_timeout)
            .build()?;

        let chain = FallbackChain::new(config.fallback_timeout)
            .with(Box::new(TrendsApiSource::new(
                client.clone(),
                config.trends_api_url.clone(),
                config.trends_bearer_token.clone(),
            )))
            .with(Box::new(TrendsScrapeSource::new(
                client,
                config.trends_scrape_url.clone(),
            )));

        Ok(Self::with_chain(chain, config.trends_refresh_interval))
    }

    #[must_use]
    pub fn with_chain(chain: FallbackChain<Vec<TrendingTopic>>, refresh_interval: Duration) -> Self {
        Self {
            chain,
            cache: RwLock::new(None),
            refresh_interval,
        }
    }

    /// Current trending topics. Never fails.
    ///
    /// Served from memory for `refresh_interval` after each resolution.
    pub async fn get_brazil_trends(&self) -> Vec<TrendingTopic> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed() < self.refresh_interval {
                    return cached.topics.clone();
                }
            }
        }

        let resolved = self.refresh().await;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CachedTrends {
            topics: resolved.value.clone(),
            fetched_at: Instant::now(),
        });

        resolved.value
    }

    /// Run the fallback chain once, bypassing the refresh interval.
    pub async fn refresh(&self) -> Resolved<Vec<TrendingTopic>> {
        let resolved = self.chain.resolve_or(static_trends).await;
        let source = match resolved.source {
            Source::Strategy(name) => name,
            Source::StaticDefault => "static",
        };
        info!(source, count = resolved.value.len(), "Trending topics refreshed");
        resolved
    }
}
