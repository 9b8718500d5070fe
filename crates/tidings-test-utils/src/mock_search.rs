// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock news-search adapter for deterministic testing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, HealthStatus, SearchAdapter, SearchOptions};
use tidings_core::types::RawArticle;

/// A mock search adapter returning a fixed number of distinct articles.
///
/// Article URLs are derived from the query, so repeating a query yields
/// the same identities (exercising dedup), while different queries yield
/// disjoint article sets.
pub struct MockSearch {
    results: usize,
    delay: Option<Duration>,
    fail: bool,
}

impl MockSearch {
    /// Returns `results` distinct articles per call.
    pub fn returning(results: usize) -> Self {
        Self {
            results,
            delay: None,
            fail: false,
        }
    }

    /// Sleeps before answering (deadline tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails every call with `ProviderUnavailable`.
    pub fn failing() -> Self {
        Self {
            results: 0,
            delay: None,
            fail: true,
        }
    }
}

#[async_trait]
impl Adapter for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        if self.fail {
            Ok(HealthStatus::Unhealthy("configured to fail".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl SearchAdapter for MockSearch {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<RawArticle>, TidingsError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TidingsError::ProviderUnavailable {
                provider: "search".into(),
                message: "mock search outage".into(),
                source: None,
            });
        }
        let slug = query.replace(' ', "-").to_lowercase();
        Ok((0..self.results.min(opts.num))
            .map(|i| RawArticle {
                title: format!("{query} development {i}"),
                summary: format!(
                    "Researchers report a breakthrough and strong progress on {query}, item {i}."
                ),
                body: None,
                url: Some(format!("https://news.example.com/{slug}/{i}")),
                source: if i % 2 == 0 { "Reuters" } else { "Example Wire" }.to_string(),
                author: None,
                published_at: Some(Utc::now() - ChronoDuration::hours(i as i64 + 1)),
                language: Some(opts.language.clone()),
                category: Some("technology".to_string()),
                tags: vec![slug.clone()],
            })
            .collect())
    }
}
