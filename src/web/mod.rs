mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::trends::TrendsService;
use crate::wordpress::WordPressClient;
use crate::youtube::YouTubeClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub wordpress: WordPressClient,
    pub trends: Arc<TrendsService>,
    pub youtube: YouTubeClient,
    pub cache: Arc<ResponseCache>,
}

impl AppState {
    /// Build every upstream client from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let wordpress =
            WordPressClient::new(&config).context("Failed to create WordPress client")?;
        let trends = TrendsService::new(&config).context("Failed to create trends service")?;
        let youtube = YouTubeClient::new(&config).context("Failed to create YouTube client")?;

        let cache = ResponseCache::new(config.response_cache_capacity);

        Ok(Self {
            config: Arc::new(config),
            wordpress,
            trends: Arc::new(trends),
            youtube,
            cache: Arc::new(cache),
        })
    }
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let state = AppState::new(config)?;
    let app = create_app(state);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
