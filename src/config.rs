use std::time::Duration;

use thiserror::Error;

use crate::cache::{CacheSpec, ResourceKind};

/// Default number of posts per page.
pub const DEFAULT_PER_PAGE: u32 = 10;
/// Largest page size WordPress accepts.
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // WordPress
    pub wordpress_api_url: String,
    pub wordpress_timeout: Duration,
    pub cache: CacheSpec,
    pub response_cache_capacity: u64,
    pub default_per_page: u32,
    pub max_pages: u32,

    // Trending topics
    pub trends_api_url: String,
    pub trends_bearer_token: Option<String>,
    pub trends_scrape_url: String,
    pub fallback_timeout: Duration,
    pub trends_refresh_interval: Duration,

    // YouTube
    pub youtube_api_url: String,
    pub youtube_api_key: Option<String>,
    pub youtube_timeout: Duration,

    // Cache revalidation webhook
    pub revalidate_secret: Option<String>,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // WordPress
            wordpress_api_url: trim_base_url(&required_env("WORDPRESS_API_URL")?),
            wordpress_timeout: Duration::from_millis(parse_env_u64("WORDPRESS_TIMEOUT_MS", 5_000)?),
            cache: cache_spec_from_env()?,
            response_cache_capacity: parse_env_u64("RESPONSE_CACHE_CAPACITY", 1_000)?,
            default_per_page: parse_env_u32("DEFAULT_PER_PAGE", DEFAULT_PER_PAGE)?,
            max_pages: parse_env_u32("MAX_PAGES", 10)?,

            // Trending topics
            trends_api_url: env_or_default(
                "TRENDS_API_URL",
                "https://api.twitter.com/1.1/trends/place.json?id=23424768",
            ),
            trends_bearer_token: optional_env("TWITTER_BEARER_TOKEN"),
            trends_scrape_url: env_or_default("TRENDS_SCRAPE_URL", "https://trends24.in/brazil/"),
            fallback_timeout: Duration::from_millis(parse_env_u64("FALLBACK_TIMEOUT_MS", 1_300)?),
            trends_refresh_interval: Duration::from_secs(parse_env_u64(
                "TRENDS_REFRESH_SECS",
                300,
            )?),

            // YouTube
            youtube_api_url: trim_base_url(&env_or_default(
                "YOUTUBE_API_URL",
                "https://www.googleapis.com/youtube/v3",
            )),
            youtube_api_key: optional_env("YOUTUBE_API_KEY"),
            youtube_timeout: Duration::from_millis(parse_env_u64("YOUTUBE_TIMEOUT_MS", 5_000)?),

            revalidate_secret: optional_env("REVALIDATE_SECRET"),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Configuration for tests: every upstream points at localhost and
    /// credentials are unset.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            wordpress_api_url: "http://127.0.0.1:9/wp-json".to_string(),
            wordpress_timeout: Duration::from_secs(5),
            cache: CacheSpec::default(),
            response_cache_capacity: 1_000,
            default_per_page: DEFAULT_PER_PAGE,
            max_pages: 10,
            trends_api_url: "http://127.0.0.1:9/trends".to_string(),
            trends_bearer_token: None,
            trends_scrape_url: "http://127.0.0.1:9/brazil/".to_string(),
            fallback_timeout: Duration::from_millis(1_300),
            trends_refresh_interval: Duration::from_secs(300),
            youtube_api_url: "http://127.0.0.1:9/youtube/v3".to_string(),
            youtube_api_key: None,
            youtube_timeout: Duration::from_secs(5),
            revalidate_secret: None,
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wordpress_api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "WORDPRESS_API_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if url::Url::parse(&self.wordpress_api_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "WORDPRESS_API_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.wordpress_api_url),
            });
        }
        if self.default_per_page == 0 || self.default_per_page > MAX_PER_PAGE {
            return Err(ConfigError::InvalidValue {
                name: "DEFAULT_PER_PAGE".to_string(),
                message: format!("must be between 1 and {MAX_PER_PAGE}"),
            });
        }
        if self.response_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RESPONSE_CACHE_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        for (name, timeout) in [
            ("WORDPRESS_TIMEOUT_MS", self.wordpress_timeout),
            ("FALLBACK_TIMEOUT_MS", self.fallback_timeout),
            ("YOUTUBE_TIMEOUT_MS", self.youtube_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn cache_spec_from_env() -> Result<CacheSpec, ConfigError> {
    let mut spec = CacheSpec::default();
    for kind in ResourceKind::ALL {
        let name = format!("CACHE_TTL_{}_MS", kind.env_suffix());
        let ttl = parse_env_u64(&name, spec.ttl_ms(kind))?;
        spec.set_ttl_ms(kind, ttl);
    }
    Ok(spec)
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
