// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a Voyage/OpenAI-shaped embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, EmbeddingAdapter, HealthStatus};
use tracing::{debug, warn};

use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// HTTP embedding provider client.
///
/// Posts `{model, input}` and expects `{data: [{index, embedding}]}`.
/// Retries once on transient statuses with a 1-second back-off, the same
/// policy as the completion client.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: reqwest::Client,
    model: String,
    dimension: usize,
    base_url: String,
    has_key: bool,
}

impl EmbeddingClient {
    /// Creates a new embeddings client.
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, TidingsError> {
        let mut headers = HeaderMap::new();
        let has_key = api_key.is_some();
        if let Some(key) = api_key {
            headers.insert(
                "authorization",
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    TidingsError::Config(format!("invalid API key header value: {e}"))
                })?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TidingsError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model,
            dimension,
            base_url,
            has_key,
        })
    }
}

#[async_trait]
impl Adapter for EmbeddingClient {
    fn name(&self) -> &str {
        "embeddings"
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        if self.has_key {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("api key not configured".into()))
        }
    }
}

#[async_trait]
impl EmbeddingAdapter for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TidingsError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let mut rate_limited = false;
        for attempt in 0..=1u32 {
            if attempt > 0 {
                warn!(attempt, "retrying embedding request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| TidingsError::ProviderUnavailable {
                    provider: "embeddings".into(),
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, batch = texts.len(), "embedding response received");

            if status.is_success() {
                let parsed: EmbeddingResponse =
                    response
                        .json()
                        .await
                        .map_err(|e| TidingsError::InvalidResponse {
                            provider: "embeddings".into(),
                            message: format!("failed to parse embeddings response: {e}"),
                        })?;
                return self.order_vectors(texts.len(), parsed);
            }

            if matches!(status.as_u16(), 429 | 500 | 503 | 529) && attempt == 0 {
                rate_limited = status.as_u16() == 429;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(TidingsError::ProviderUnavailable {
                provider: "embeddings".into(),
                message: format!("API returned {status}: {body}"),
                source: None,
            });
        }

        if rate_limited {
            Err(TidingsError::ProviderRateLimited {
                provider: "embeddings".into(),
            })
        } else {
            Err(TidingsError::ProviderUnavailable {
                provider: "embeddings".into(),
                message: "embedding request failed after retries".into(),
                source: None,
            })
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl EmbeddingClient {
    /// Reorders response vectors by index and verifies count and dimension.
    fn order_vectors(
        &self,
        expected: usize,
        response: EmbeddingResponse,
    ) -> Result<Vec<Vec<f32>>, TidingsError> {
        if response.data.len() != expected {
            return Err(TidingsError::InvalidResponse {
                provider: "embeddings".into(),
                message: format!(
                    "expected {expected} embeddings, got {}",
                    response.data.len()
                ),
            });
        }
        let mut ordered = vec![Vec::new(); expected];
        for datum in response.data {
            if datum.index >= expected {
                return Err(TidingsError::InvalidResponse {
                    provider: "embeddings".into(),
                    message: format!("embedding index {} out of range", datum.index),
                });
            }
            if datum.embedding.len() != self.dimension {
                return Err(TidingsError::InvalidResponse {
                    provider: "embeddings".into(),
                    message: format!(
                        "expected dimension {}, got {}",
                        self.dimension,
                        datum.embedding.len()
                    ),
                });
            }
            ordered[datum.index] = datum.embedding;
        }
        Ok(ordered)
    }
}
