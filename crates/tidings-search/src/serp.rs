// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! News search adapter for a SerpAPI-shaped provider.
//!
//! One invocation issues one outbound call against the google_news engine,
//! normalizes the payload into [`RawArticle`] records, and deduplicates by
//! URL within the single response. Rate limits are observed via a token
//! bucket; 429/503 responses retry with exponential back-off.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Deserialize;
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, HealthStatus, Lookback, SearchAdapter, SearchOptions};
use tidings_core::types::RawArticle;
use tracing::{debug, warn};

use crate::rate::TokenBucket;

/// Retry schedule: base 500 ms, factor 2, jitter +/-25%, 3 attempts total.
const RETRY_BASE: Duration = Duration::from_millis(500);
const MAX_ATTEMPTS: u32 = 3;

/// SerpAPI-shaped news search client.
pub struct SerpSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    bucket: TokenBucket,
    /// Process-global bound on in-flight search calls.
    concurrency: tokio::sync::Semaphore,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    news_results: Vec<SerpNewsItem>,
}

#[derive(Debug, Deserialize)]
struct SerpNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    source: Option<SerpSource>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// The provider emits `source` as either a bare string or an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SerpSource {
    Name(String),
    Detailed {
        #[serde(default)]
        name: String,
    },
}

impl SerpSource {
    fn into_name(self) -> String {
        match self {
            SerpSource::Name(name) => name,
            SerpSource::Detailed { name } => name,
        }
    }
}

impl SerpSearch {
    /// Creates a new search client.
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        rate_per_minute: u32,
        concurrency: usize,
        timeout: Duration,
    ) -> Result<Self, TidingsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TidingsError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url,
            bucket: TokenBucket::per_minute(rate_per_minute),
            concurrency: tokio::sync::Semaphore::new(concurrency.max(1)),
        })
    }

    /// Translates the relative lookback into the provider's `qdr` vocabulary.
    fn window_param(window: Lookback) -> &'static str {
        match window {
            Lookback::Day => "qdr:d",
            Lookback::Week => "qdr:w",
            Lookback::Month => "qdr:m",
            Lookback::Year => "qdr:y",
        }
    }

    async fn fetch(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<SerpResponse, TidingsError> {
        let mut params: Vec<(&str, String)> = vec![
            ("engine", "google_news".to_string()),
            ("q", query.to_string()),
            ("hl", opts.language.clone()),
            ("gl", opts.country.clone()),
            ("num", opts.num.min(100).to_string()),
            ("tbm", "nws".to_string()),
            ("tbs", Self::window_param(opts.window).to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        // Scoped acquisition: the permit releases even on failure.
        let _permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|_| TidingsError::Cancelled)?;

        let mut saw_rate_limit = false;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let backoff = backoff_with_jitter(attempt);
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, "retrying news search");
                tokio::time::sleep(backoff).await;
            }

            self.bucket.acquire().await;

            let response = self
                .client
                .get(&self.base_url)
                .query(&params)
                .send()
                .await
                .map_err(|e| TidingsError::ProviderUnavailable {
                    provider: "search".into(),
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "search response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    TidingsError::ProviderUnavailable {
                        provider: "search".into(),
                        message: format!("failed to read response body: {e}"),
                        source: Some(Box::new(e)),
                    }
                })?;
                return serde_json::from_str(&body).map_err(|e| {
                    TidingsError::InvalidResponse {
                        provider: "search".into(),
                        message: format!("unparseable search payload: {e}"),
                    }
                });
            }

            if matches!(status.as_u16(), 429 | 503) {
                saw_rate_limit |= status.as_u16() == 429;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(TidingsError::ProviderUnavailable {
                provider: "search".into(),
                message: format!("search API returned {status}: {body}"),
                source: None,
            });
        }

        if saw_rate_limit {
            Err(TidingsError::ProviderRateLimited {
                provider: "search".into(),
            })
        } else {
            Err(TidingsError::ProviderUnavailable {
                provider: "search".into(),
                message: format!("search failed after {MAX_ATTEMPTS} attempts"),
                source: None,
            })
        }
    }
}

/// Exponential back-off with +/-25% jitter for the given attempt (1-based).
fn backoff_with_jitter(attempt: u32) -> Duration {
    let base = RETRY_BASE.as_millis() as f64 * f64::from(2u32.pow(attempt - 1));
    let jitter = rand::rng().random_range(0.75..=1.25);
    Duration::from_millis((base * jitter) as u64)
}

/// Best-effort parse of the provider's inconsistent date formats.
fn parse_provider_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // "MM/DD/YYYY, hh:mm AM, +0000 UTC" shape used by the news engine.
    if let Some(prefix) = raw.split(", +").next()
        && let Ok(dt) =
            chrono::NaiveDateTime::parse_from_str(prefix, "%m/%d/%Y, %I:%M %p")
    {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

#[async_trait]
impl Adapter for SerpSearch {
    fn name(&self) -> &str {
        "search"
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        if self.api_key.is_some() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("api key not configured".into()))
        }
    }
}

#[async_trait]
impl SearchAdapter for SerpSearch {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<RawArticle>, TidingsError> {
        let response = self.fetch(query, opts).await?;

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut articles = Vec::new();

        for item in response.news_results {
            if item.title.trim().is_empty() {
                warn!("dropping search result with empty title");
                continue;
            }
            let url = item.link.as_deref().map(|u| u.trim().to_lowercase());
            if let Some(u) = &url
                && !u.is_empty()
                && !seen_urls.insert(u.clone())
            {
                continue; // URL already seen within this response.
            }

            articles.push(RawArticle {
                title: item.title.trim().to_string(),
                summary: item.snippet.trim().to_string(),
                body: None,
                url: item.link,
                source: item
                    .source
                    .map(SerpSource::into_name)
                    .unwrap_or_default(),
                author: None,
                published_at: item.date.as_deref().and_then(parse_provider_date),
                language: Some(opts.language.clone()),
                category: item.category,
                tags: Vec::new(),
            });

            if articles.len() >= opts.num {
                break;
            }
        }

        debug!(query, count = articles.len(), "normalized search results");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_search(base_url: &str) -> SerpSearch {
        SerpSearch::new(
            Some("serp-key".into()),
            base_url.to_string(),
            600,
            4,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn sample_payload() -> serde_json::Value {
        serde_json::json!({
            "news_results": [
                {
                    "title": "Quantum leap announced",
                    "snippet": "A lab reports a new qubit record.",
                    "link": "https://news.example.com/quantum-leap",
                    "source": {"name": "Example News"},
                    "date": "2026-07-30"
                },
                {
                    "title": "Quantum leap announced",
                    "snippet": "Duplicate URL, different casing.",
                    "link": "https://NEWS.example.com/quantum-leap",
                    "source": "Example News",
                    "date": "2026-07-30"
                },
                {
                    "title": "",
                    "snippet": "No title, must be dropped.",
                    "link": "https://news.example.com/untitled",
                    "source": "Example News"
                },
                {
                    "title": "Second qubit record",
                    "snippet": "Another lab responds.",
                    "link": "https://news.example.com/second-record",
                    "source": "Other Wire",
                    "date": "not a date"
                }
            ]
        })
    }

    #[tokio::test]
    async fn search_normalizes_and_dedups_within_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("engine", "google_news"))
            .and(query_param("q", "quantum computing"))
            .and(query_param("tbs", "qdr:d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_payload()))
            .mount(&server)
            .await;

        let search = test_search(&server.uri());
        let articles = search
            .search("quantum computing", &SearchOptions::default())
            .await
            .unwrap();

        // 4 raw items: one duplicate URL, one missing title.
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Quantum leap announced");
        assert_eq!(articles[0].source, "Example News");
        assert!(articles[0].published_at.is_some());
        // Unparseable dates stay empty rather than fabricating instants.
        assert!(articles[1].published_at.is_none());
    }

    #[tokio::test]
    async fn search_caps_results_at_requested_num() {
        let server = MockServer::start().await;
        let items: Vec<serde_json::Value> = (0..10)
            .map(|i| {
                serde_json::json!({
                    "title": format!("Story {i}"),
                    "snippet": "s",
                    "link": format!("https://news.example.com/{i}"),
                    "source": "Wire"
                })
            })
            .collect();
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"news_results": items})),
            )
            .mount(&server)
            .await;

        let search = test_search(&server.uri());
        let opts = SearchOptions {
            num: 3,
            ..SearchOptions::default()
        };
        let articles = search.search("anything", &opts).await.unwrap();
        assert_eq!(articles.len(), 3);
    }

    #[tokio::test]
    async fn search_retries_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_payload()))
            .mount(&server)
            .await;

        let search = test_search(&server.uri());
        let articles = search
            .search("quantum", &SearchOptions::default())
            .await
            .unwrap();
        assert!(!articles.is_empty());
    }

    #[tokio::test]
    async fn search_exhausted_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let search = test_search(&server.uri());
        let err = search
            .search("quantum", &SearchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider_rate_limited");
    }

    #[tokio::test]
    async fn search_unparseable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let search = test_search(&server.uri());
        let err = search
            .search("quantum", &SearchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
    }

    #[test]
    fn window_translation_covers_all_lookbacks() {
        assert_eq!(SerpSearch::window_param(Lookback::Day), "qdr:d");
        assert_eq!(SerpSearch::window_param(Lookback::Week), "qdr:w");
        assert_eq!(SerpSearch::window_param(Lookback::Month), "qdr:m");
        assert_eq!(SerpSearch::window_param(Lookback::Year), "qdr:y");
    }

    #[test]
    fn provider_dates_parse_common_shapes() {
        assert!(parse_provider_date("2026-07-30T12:00:00Z").is_some());
        assert!(parse_provider_date("2026-07-30").is_some());
        assert!(parse_provider_date("07/30/2026, 07:00 AM, +0000 UTC").is_some());
        assert!(parse_provider_date("2 hours ago").is_none());
    }
}
