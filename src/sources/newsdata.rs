//! NewsData.io latest-news search client.
//!
//! Issues one `GET {endpoint}?q=…&language=…&size=…` per request, with the key
//! in the `X-ACCESS-KEY` header so it never appears in a URL.
//! NewsData answers with an envelope whose `results` is an article array on
//! success and an error object otherwise; a non-`success` status is treated
//! as a failure even when the HTTP status is 200.
//!
//! # Article Hygiene
//!
//! Records without a title or an absolute `http(s)` link are skipped, HTML is
//! stripped from descriptions, and duplicate links keep their first
//! occurrence. At most `max_articles` survive.

use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::{RawArticle, Topic};
use crate::sources::ArticleSource;
use crate::utils::{collapse_whitespace, strip_html, truncate_for_log};
use chrono::NaiveDateTime;
use itertools::Itertools;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

const PUB_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const API_KEY_HEADER: &str = "X-ACCESS-KEY";

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source_id: Option<String>,
}

/// Client for the NewsData.io `news` endpoint.
#[derive(Debug, Clone)]
pub struct NewsDataClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    max_articles: usize,
}

impl NewsDataClient {
    pub fn new(client: Client, config: &PipelineConfig) -> Self {
        Self {
            client,
            endpoint: config.news_endpoint.clone(),
            api_key: config.news_api_key.clone(),
            timeout: config.fetch_timeout,
            max_articles: config.max_articles,
        }
    }
}

impl ArticleSource for NewsDataClient {
    #[instrument(level = "info", skip_all, fields(topic = %topic, %language))]
    async fn fetch(&self, topic: &Topic, language: &str) -> Result<Vec<RawArticle>, FetchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("NEWS_API_KEY is not configured");
            return Err(FetchError::Unauthorized("NEWS_API_KEY is not set".to_string()));
        };

        let query = topic.query();
        let size = self.max_articles.to_string();
        let t0 = Instant::now();
        let response = self
            .client
            .get(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .query(&[
                ("q", query.as_str()),
                ("language", language),
                ("size", size.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        let elapsed_ms = t0.elapsed().as_millis();
        debug!(%status, elapsed_ms, body = %truncate_for_log(&body, 300), "NewsData response");

        let raw = decode_response(status, &body).inspect_err(|e| {
            warn!(%status, elapsed_ms, error = %e, "NewsData request failed");
        })?;
        let fetched = raw.len();
        let articles = clean_articles(raw, self.max_articles);
        info!(fetched, kept = articles.len(), elapsed_ms, %query, "Fetched articles");

        if articles.is_empty() {
            return Err(FetchError::NoResults);
        }
        Ok(articles)
    }
}

// reqwest's Display includes the request URL; only the cause is kept.
fn transport_error(e: reqwest::Error) -> FetchError {
    let e = e.without_url();
    if e.is_timeout() {
        FetchError::Network("request timed out".to_string())
    } else if e.is_connect() || e.is_request() || e.is_body() {
        FetchError::Network(e.to_string())
    } else {
        FetchError::Unexpected(e.to_string())
    }
}

/// Turn an HTTP status and body into raw article records or a typed error.
fn decode_response(status: StatusCode, body: &str) -> Result<Vec<NewsDataArticle>, FetchError> {
    let envelope: Option<Envelope> = serde_json::from_str(body).ok();

    if status.is_success() {
        let envelope = envelope.ok_or_else(|| {
            FetchError::Unexpected(format!("unreadable body: {}", truncate_for_log(body, 120)))
        })?;
        if envelope.status == "success" {
            return serde_json::from_value(envelope.results)
                .map_err(|e| FetchError::Unexpected(format!("unreadable results: {e}")));
        }
        let error: ErrorBody = serde_json::from_value(envelope.results).unwrap_or_default();
        return Err(classify_error(status, error));
    }

    let error = envelope
        .and_then(|env| serde_json::from_value::<ErrorBody>(env.results).ok())
        .unwrap_or_default();
    Err(classify_error(status, error))
}

fn classify_error(status: StatusCode, error: ErrorBody) -> FetchError {
    let code = error.code.unwrap_or_default().to_lowercase();
    let message = error
        .message
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || code.contains("unauthorized")
        || code.contains("apikey")
    {
        FetchError::Unauthorized(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS || code.contains("ratelimit") {
        FetchError::RateLimited
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
    {
        FetchError::Network(message)
    } else {
        FetchError::Unexpected(message)
    }
}

fn clean_articles(raw: Vec<NewsDataArticle>, max_articles: usize) -> Vec<RawArticle> {
    raw.into_iter()
        .filter_map(|article| {
            let title = collapse_whitespace(article.title.as_deref().unwrap_or_default());
            let link = article.link.as_deref().unwrap_or_default().trim().to_string();
            if title.is_empty() || !is_web_url(&link) {
                debug!(%title, %link, "Skipping incomplete article");
                return None;
            }
            Some(RawArticle {
                title,
                description: strip_html(article.description.as_deref().unwrap_or_default()),
                link,
                source_id: article.source_id.filter(|s| !s.trim().is_empty()),
                published: article
                    .pub_date
                    .as_deref()
                    .and_then(|d| NaiveDateTime::parse_from_str(d.trim(), PUB_DATE_FORMAT).ok()),
            })
        })
        .unique_by(|article| article.link.clone())
        .take(max_articles)
        .collect()
}

fn is_web_url(link: &str) -> bool {
    Url::parse(link)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, silent_server};

    const SUCCESS_BODY: &str = r#"{
        "status": "success",
        "totalResults": 4,
        "results": [
            {
                "title": "AI breakthroughs in 2024",
                "link": "https://example.com/a1",
                "description": "<p>New models <b>arrive</b>.</p>",
                "pubDate": "2024-05-01 12:34:56",
                "source_id": "example"
            },
            {
                "title": "Duplicate of the first",
                "link": "https://example.com/a1",
                "description": null,
                "pubDate": null,
                "source_id": null
            },
            {
                "title": null,
                "link": "https://example.com/untitled"
            },
            {
                "title": "Chip exports tighten",
                "link": "https://example.com/a2",
                "description": null,
                "pubDate": "not a date",
                "source_id": ""
            }
        ]
    }"#;

    #[test]
    fn test_decode_and_clean_success() {
        let raw = decode_response(StatusCode::OK, SUCCESS_BODY).unwrap();
        assert_eq!(raw.len(), 4);

        let articles = clean_articles(raw, 10);
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].title, "AI breakthroughs in 2024");
        assert_eq!(articles[0].link, "https://example.com/a1");
        assert_eq!(articles[0].description, "New models arrive .");
        assert_eq!(articles[0].source_id.as_deref(), Some("example"));
        assert_eq!(
            articles[0].published.map(|p| p.to_string()).as_deref(),
            Some("2024-05-01 12:34:56")
        );

        assert_eq!(articles[1].link, "https://example.com/a2");
        assert_eq!(articles[1].description, "");
        assert!(articles[1].source_id.is_none());
        assert!(articles[1].published.is_none());
    }

    #[test]
    fn test_clean_articles_caps_count() {
        let raw = (0..15)
            .map(|i| NewsDataArticle {
                title: Some(format!("Story {i}")),
                link: Some(format!("https://example.com/{i}")),
                description: None,
                pub_date: None,
                source_id: None,
            })
            .collect();
        let articles = clean_articles(raw, 10);
        assert_eq!(articles.len(), 10);
        assert_eq!(articles[9].title, "Story 9");
    }

    #[test]
    fn test_clean_articles_rejects_non_web_links() {
        let raw = vec![
            NewsDataArticle {
                title: Some("Relative".into()),
                link: Some("/news/1".into()),
                description: None,
                pub_date: None,
                source_id: None,
            },
            NewsDataArticle {
                title: Some("Mail".into()),
                link: Some("mailto:desk@example.com".into()),
                description: None,
                pub_date: None,
                source_id: None,
            },
        ];
        assert!(clean_articles(raw, 10).is_empty());
    }

    #[test]
    fn test_empty_results() {
        let raw = decode_response(StatusCode::OK, r#"{"status":"success","results":[]}"#).unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_unauthorized() {
        let body = r#"{"status":"error","results":{"message":"API key invalid","code":"Unauthorized"}}"#;
        let err = decode_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert_eq!(err, FetchError::Unauthorized("API key invalid".to_string()));
    }

    #[test]
    fn test_error_envelope_on_http_ok() {
        let body = r#"{"status":"error","results":{"message":"quota","code":"RateLimitExceeded"}}"#;
        let err = decode_response(StatusCode::OK, body).unwrap_err();
        assert_eq!(err, FetchError::RateLimited);
    }

    #[test]
    fn test_rate_limited_status() {
        let err = decode_response(StatusCode::TOO_MANY_REQUESTS, "slow down").unwrap_err();
        assert_eq!(err, FetchError::RateLimited);
    }

    #[test]
    fn test_gateway_errors_are_network() {
        let err = decode_response(StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err();
        assert_eq!(err, FetchError::Network("HTTP 503".to_string()));
    }

    #[test]
    fn test_unreadable_success_body() {
        let err = decode_response(StatusCode::OK, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, FetchError::Unexpected(_)));
    }

    #[test]
    fn test_unclassified_error() {
        let body = r#"{"status":"error","results":{"message":"bad filter","code":"UnsupportedFilter"}}"#;
        let err = decode_response(StatusCode::UNPROCESSABLE_ENTITY, body).unwrap_err();
        assert_eq!(err, FetchError::Unexpected("bad filter".to_string()));
    }

    #[tokio::test]
    async fn test_missing_key_is_unauthorized_without_request() {
        let config = PipelineConfig {
            news_endpoint: "http://127.0.0.1:9/never".to_string(),
            ..PipelineConfig::default()
        };
        let client = NewsDataClient::new(Client::new(), &config);
        let topic = Topic::parse("technology").unwrap();
        let err = client.fetch(&topic, "en").await.unwrap_err();
        assert!(matches!(err, FetchError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_silent_upstream_times_out() {
        let (base, request_head) = silent_server().await;
        let config = PipelineConfig {
            news_api_key: Some("SUPERSECRETKEY".to_string()),
            news_endpoint: format!("{base}/api/1/news"),
            fetch_timeout: Duration::from_millis(300),
            ..PipelineConfig::default()
        };
        let client = NewsDataClient::new(Client::new(), &config);
        let topic = Topic::parse("technology").unwrap();

        let t0 = Instant::now();
        let err = client.fetch(&topic, "en").await.unwrap_err();
        assert_eq!(err, FetchError::Network("request timed out".to_string()));
        assert!(t0.elapsed() < Duration::from_secs(5));

        let head = request_head.await.unwrap();
        assert!(head.starts_with("GET /api/1/news?q=technology&language=en&size=10 "));
        assert!(head.to_lowercase().contains("x-access-key: supersecretkey"));
        assert!(!head.contains("apikey="));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_keeps_key_out_of_error() {
        let config = PipelineConfig {
            news_api_key: Some("SUPERSECRETKEY".to_string()),
            news_endpoint: format!("{}/api/1/news", closed_port_url()),
            ..PipelineConfig::default()
        };
        let client = NewsDataClient::new(Client::new(), &config);
        let topic = Topic::parse("technology").unwrap();

        let err = client.fetch(&topic, "en").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        let text = err.to_string();
        assert!(!text.contains("SUPERSECRETKEY"));
        assert!(!text.contains("/api/1/news"));
    }
}
