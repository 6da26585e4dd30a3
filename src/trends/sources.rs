use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;

use super::{format_count, TrendingTopic, MAX_API_TOPICS, MAX_SCRAPED_TOPICS, MIN_TOPICS, UNKNOWN_COUNT};
use crate::constants::{BROWSER_USER_AGENT, CLIENT_USER_AGENT};
use crate::fallback::{Attempt, Strategy};
use crate::upstream;

static TREND_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.main a").unwrap());

#[derive(Debug, Deserialize)]
struct TrendsPlace {
    trends: Vec<ApiTrend>,
}

#[derive(Debug, Deserialize)]
struct ApiTrend {
    name: String,
    #[serde(default)]
    tweet_volume: Option<u64>,
}

/// Bearer-authenticated trends API. Skipped when no token is configured.
pub struct TrendsApiSource {
    client: Client,
    url: String,
    bearer_token: Option<String>,
}

impl TrendsApiSource {
    #[must_use]
    pub fn new(client: Client, url: String, bearer_token: Option<String>) -> Self {
        Self {
            client,
            url,
            bearer_token,
        }
    }
}

#[async_trait]
impl Strategy<Vec<TrendingTopic>> for TrendsApiSource {
    fn name(&self) -> &'static str {
        "trends_api"
    }

    async fn attempt(&self) -> Attempt<Vec<TrendingTopic>> {
        let Some(token) = self.bearer_token.as_deref() else {
            return Attempt::Skipped;
        };

        let request = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(USER_AGENT, CLIENT_USER_AGENT);

        let result = async {
            let response = upstream::send(&self.client, request).await?;
            parse_api_trends(&response.body)
        }
        .await;

        into_attempt(result)
    }
}

/// Scrape of a public trends page. Counts are not exposed there.
pub struct TrendsScrapeSource {
    client: Client,
    url: String,
}

impl TrendsScrapeSource {
    #[must_use]
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl Strategy<Vec<TrendingTopic>> for TrendsScrapeSource {
    fn name(&self) -> &'static str {
        "trends_scrape"
    }

    async fn attempt(&self) -> Attempt<Vec<TrendingTopic>> {
        let request = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "text/html");

        let result = async {
            let response = upstream::send(&self.client, request).await?;
            Ok::<_, anyhow::Error>(parse_scraped_trends(&response.body))
        }
        .await;

        into_attempt(result.and_then(require_enough))
    }
}

/// Parse a trends API body: an array whose first element holds `trends`.
///
/// # Errors
///
/// Returns an error if the body is malformed or holds too few topics.
pub fn parse_api_trends(body: &str) -> Result<Vec<TrendingTopic>> {
    let places: Vec<TrendsPlace> =
        serde_json::from_str(body).context("Malformed trends API response")?;
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Trends API returned no locations"))?;

    let topics = place
        .trends
        .into_iter()
        .take(MAX_API_TOPICS)
        .map(|t| TrendingTopic::new(t.name, format_count(t.tweet_volume)))
        .collect();

    require_enough(topics)
}

/// Extract tag names from anchors inside `td.main` cells.
#[must_use]
pub fn parse_scraped_trends(html: &str) -> Vec<TrendingTopic> {
    let document = Html::parse_document(html);

    document
        .select(&TREND_LINK)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .take(MAX_SCRAPED_TOPICS)
        .map(|name| TrendingTopic::new(name, UNKNOWN_COUNT))
        .collect()
}

fn require_enough(topics: Vec<TrendingTopic>) -> Result<Vec<TrendingTopic>> {
    if topics.len() < MIN_TOPICS {
        return Err(anyhow!(
            "only {} topics, need at least {MIN_TOPICS}",
            topics.len()
        ));
    }
    Ok(topics)
}

fn into_attempt<E>(result: Result<Vec<TrendingTopic>, E>) -> Attempt<Vec<TrendingTopic>>
where
    E: Into<anyhow::Error>,
{
    match result {
        Ok(topics) => Attempt::Success(topics),
        Err(e) => Attempt::Failed(e.into()),
    }
}
