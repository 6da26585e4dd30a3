//! Integration tests for the trending-topics fallback chain.

use std::time::Duration;

use news_content_gateway::config::Config;
use news_content_gateway::fallback::Source;
use news_content_gateway::trends::{static_trends, TrendsService};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_trends(count: usize) -> serde_json::Value {
    let trends: Vec<_> = (0..count)
        .map(|i| json!({"name": format!("#Assunto{i}"), "tweet_volume": 1_500 * (i as u64 + 1)}))
        .collect();
    json!([{ "trends": trends, "locations": [{"name": "Brazil"}] }])
}

fn scrape_page(count: usize) -> String {
    let rows: String = (0..count)
        .map(|i| format!(r#"<tr><td class="main"><a href="/topic/{i}">Tema {i}</a></td></tr>"#))
        .collect();
    format!("<html><body><table>{rows}</table></body></html>")
}

fn config_for(server: &MockServer, token: Option<&str>) -> Config {
    Config {
        trends_api_url: format!("{}/trends", server.uri()),
        trends_bearer_token: token.map(ToString::to_string),
        trends_scrape_url: format!("{}/brazil/", server.uri()),
        fallback_timeout: Duration::from_millis(500),
        ..Config::for_testing()
    }
}

#[tokio::test]
async fn test_primary_api_wins_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trends"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_trends(9)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scrape_page(10)))
        .expect(0)
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, Some("token-123"))).unwrap();
    let resolved = service.refresh().await;

    assert_eq!(resolved.source, Source::Strategy("trends_api"));
    assert_eq!(resolved.value.len(), 7);
    assert_eq!(resolved.value[0].tag, "#Assunto0");
    assert_eq!(resolved.value[0].tweets, "1.5K");
}

#[tokio::test]
async fn test_missing_token_skips_to_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trends"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_trends(9)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scrape_page(12)))
        .expect(1)
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, None)).unwrap();
    let resolved = service.refresh().await;

    assert_eq!(resolved.source, Source::Strategy("trends_scrape"));
    assert_eq!(resolved.value.len(), 10);
    assert!(resolved.value.iter().all(|t| t.tweets == "N/A"));
}

#[tokio::test]
async fn test_failing_primary_falls_back_to_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trends"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scrape_page(6)))
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, Some("token"))).unwrap();
    let resolved = service.refresh().await;

    assert_eq!(resolved.source, Source::Strategy("trends_scrape"));
    assert_eq!(resolved.value.len(), 6);
}

#[tokio::test]
async fn test_too_few_topics_is_not_usable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trends"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_trends(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scrape_page(3)))
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, Some("token"))).unwrap();
    let resolved = service.refresh().await;

    assert_eq!(resolved.source, Source::StaticDefault);
    assert_eq!(resolved.value, static_trends());
}

#[tokio::test]
async fn test_hanging_primary_is_cut_off() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trends"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(api_trends(9))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scrape_page(8)))
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, Some("token"))).unwrap();
    let started = std::time::Instant::now();
    let resolved = service.refresh().await;

    assert_eq!(resolved.source, Source::Strategy("trends_scrape"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unreachable_sources_use_static_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, None)).unwrap();

    let first = service.get_brazil_trends().await;
    let second = service.get_brazil_trends().await;

    assert!(first.len() >= 5);
    assert_eq!(first, static_trends());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_results_are_reused_within_refresh_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/brazil/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(scrape_page(7)))
        .expect(1)
        .mount(&server)
        .await;

    let service = TrendsService::new(&config_for(&server, None)).unwrap();
    let first = service.get_brazil_trends().await;
    let second = service.get_brazil_trends().await;

    assert_eq!(first.len(), 7);
    assert_eq!(first, second);
}
