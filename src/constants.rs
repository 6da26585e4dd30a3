//! Shared constants used across the application.

/// User agent for API requests made on behalf of the site.
pub const CLIENT_USER_AGENT: &str = concat!("news-content-gateway/", env!("CARGO_PKG_VERSION"));

/// Browser user agent for scraping pages that reject non-browser clients.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
