// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider for deterministic testing.
//!
//! Plain completions are popped from a FIFO queue, falling back to a
//! default reply when the queue runs dry. Structured completions return a
//! canned, schema-valid card object.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tidings_core::TidingsError;
use tidings_core::traits::{
    Adapter, CompletionAdapter, CompletionRequest, CompletionResponse, HealthStatus,
    OutputSchema, TokenUsage,
};
use tokio::sync::Mutex;

/// A mock LLM provider with pre-configured responses.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    fail: bool,
}

impl MockProvider {
    /// An empty-queue provider; every completion yields the default text.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fail: false,
        }
    }

    /// Pre-loads the FIFO response queue.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            fail: false,
        }
    }

    /// Fails every call with `ProviderUnavailable`.
    pub fn failing() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fail: true,
        }
    }

    /// Appends a response to the queue.
    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(text);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockProvider {
    fn name(&self) -> &str {
        "mock-llm"
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
impl CompletionAdapter for MockProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, TidingsError> {
        if self.fail {
            return Err(TidingsError::ProviderUnavailable {
                provider: "mock-llm".into(),
                message: "mock llm outage".into(),
                source: None,
            });
        }
        let text = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "## Summary\nMock reply citing [1].".to_string());
        Ok(CompletionResponse {
            text,
            usage: TokenUsage {
                input_tokens: 120,
                output_tokens: 60,
            },
        })
    }

    async fn complete_structured(
        &self,
        _request: CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<(serde_json::Value, TokenUsage), TidingsError> {
        if self.fail {
            return Err(TidingsError::ProviderUnavailable {
                provider: "mock-llm".into(),
                message: "mock llm outage".into(),
                source: None,
            });
        }
        let value = serde_json::json!({
            "headline": "Mock card headline",
            "summary": "First sentence of the mock card. Second sentence with detail.",
            "keyPoints": ["key point one", "key point two", "key point three"],
            "topicTags": ["technology"]
        });
        schema
            .check(&value)
            .map_err(TidingsError::UnstructuredOutput)?;
        Ok((
            value,
            TokenUsage {
                input_tokens: 150,
                output_tokens: 80,
            },
        ))
    }
}
