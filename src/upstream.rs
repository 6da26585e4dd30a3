//! Shared plumbing for calls to upstream HTTP APIs.
//!
//! Every outbound request goes through [`send`], which classifies failures
//! into [`UpstreamError`] variants. Handlers map all of them to a generic
//! 5xx response. The variants only differ in what gets logged.

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status} for {url}")]
    Http { status: StatusCode, url: String },
    #[error("upstream returned an empty body for {url}")]
    EmptyResponse { url: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Short label for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::EmptyResponse { .. } => "empty_response",
            Self::Timeout { .. } => "timeout",
            Self::Request { .. } => "request",
            Self::Decode { .. } => "decode",
        }
    }

    /// HTTP status returned by the upstream, if it got that far.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A successful upstream response with its body read into memory.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub url: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl UpstreamResponse {
    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Decode`] if the body is not the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, UpstreamError> {
        serde_json::from_str(&self.body).map_err(|source| UpstreamError::Decode {
            url: self.url.clone(),
            source,
        })
    }

    /// Read a numeric header such as `X-WP-Total`.
    #[must_use]
    pub fn header_u64(&self, name: &str) -> Option<u64> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

/// Send a request and read its body.
///
/// The URL recorded in errors has its query string removed, so credentials
/// passed as query parameters never end up in logs.
///
/// # Errors
///
/// Returns an error for transport failures, timeouts, non-2xx statuses and
/// empty bodies.
pub async fn send(client: &Client, request: RequestBuilder) -> Result<UpstreamResponse, UpstreamError> {
    let request = request
        .build()
        .map_err(|e| UpstreamError::from_reqwest("<unbuilt request>", e))?;

    let url = redacted_url(request.url());
    debug!(url = %url, method = %request.method(), "Sending upstream request");

    let response = client
        .execute(request)
        .await
        .map_err(|e| UpstreamError::from_reqwest(&url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Http { status, url });
    }

    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::from_reqwest(&url, e))?;

    if body.trim().is_empty() {
        return Err(UpstreamError::EmptyResponse { url });
    }

    Ok(UpstreamResponse { url, headers, body })
}

fn redacted_url(url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
