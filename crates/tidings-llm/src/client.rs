// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`] which handles request construction,
//! authentication, transient error retry, and structured-output
//! enforcement against caller-provided schemas.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tidings_core::TidingsError;
use tidings_core::traits::{
    Adapter, ChatMessage, ChatRole, CompletionAdapter, CompletionRequest,
    CompletionResponse, HealthStatus, OutputSchema, TokenUsage,
};
use tracing::{debug, warn};

use crate::structured::extract_json_object;
use crate::types::{ApiErrorResponse, ApiMessage, MessageRequest, MessageResponse};

/// Default base URL for the Anthropic Messages API.
const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// HTTP client for Anthropic API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503, 529). Retries once with a one
/// second back-off; further failures propagate as `ProviderUnavailable`
/// (or `ProviderRateLimited` when the final status was 429).
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    model: String,
    max_retries: u32,
    base_url: String,
    has_key: bool,
}

impl AnthropicClient {
    /// Creates a new Anthropic API client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key for authentication
    /// * `api_version` - API version string (e.g., "2023-06-01")
    /// * `model` - Model identifier for completions
    /// * `timeout` - Per-call timeout
    pub fn new(
        api_key: Option<String>,
        api_version: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, TidingsError> {
        let mut headers = HeaderMap::new();
        let has_key = api_key.is_some();
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(&key).map_err(|e| {
                    TidingsError::Config(format!("invalid API key header value: {e}"))
                })?,
            );
        }
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&api_version).map_err(|e| {
                TidingsError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TidingsError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model,
            max_retries: 1,
            base_url: API_BASE_URL.to_string(),
            has_key,
        })
    }

    /// Returns the configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Overrides the base URL (alternate endpoints, wiremock in tests).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends a non-streaming request and returns the parsed response.
    ///
    /// On transient errors (429, 500, 503, 529), retries once after a
    /// 1-second delay.
    async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, TidingsError> {
        let mut last_status: Option<reqwest::StatusCode> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await
                .map_err(|e| TidingsError::ProviderUnavailable {
                    provider: "anthropic".into(),
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    TidingsError::ProviderUnavailable {
                        provider: "anthropic".into(),
                        message: format!("failed to read response body: {e}"),
                        source: Some(Box::new(e)),
                    }
                })?;
                return serde_json::from_str(&body).map_err(|e| {
                    TidingsError::InvalidResponse {
                        provider: "anthropic".into(),
                        message: format!("failed to parse API response: {e}"),
                    }
                });
            }

            if is_transient_status(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_status = Some(status);
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &body));
        }

        // Loop exits only via return; reaching here means the last attempt
        // observed a transient status and the budget is spent.
        Err(match last_status {
            Some(s) if s.as_u16() == 429 => TidingsError::ProviderRateLimited {
                provider: "anthropic".into(),
            },
            _ => TidingsError::ProviderUnavailable {
                provider: "anthropic".into(),
                message: "completion request failed after retries".into(),
                source: None,
            },
        })
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

/// Maps a terminal API error to the taxonomy.
fn classify_api_error(status: reqwest::StatusCode, body: &str) -> TidingsError {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        // An over-long prompt is the caller's bug, not a retry condition.
        if api_err.error.type_ == "invalid_request_error"
            && api_err.error.message.contains("prompt is too long")
        {
            return TidingsError::ContextOverflow(api_err.error.message);
        }
        if status.as_u16() == 429 {
            return TidingsError::ProviderRateLimited {
                provider: "anthropic".into(),
            };
        }
        return TidingsError::ProviderUnavailable {
            provider: "anthropic".into(),
            message: format!(
                "API error ({}): {}",
                api_err.error.type_, api_err.error.message
            ),
            source: None,
        };
    }
    if status.as_u16() == 429 {
        return TidingsError::ProviderRateLimited {
            provider: "anthropic".into(),
        };
    }
    TidingsError::ProviderUnavailable {
        provider: "anthropic".into(),
        message: format!("API returned {status}: {body}"),
        source: None,
    }
}

fn to_wire_request(model: &str, request: &CompletionRequest) -> MessageRequest {
    MessageRequest {
        model: model.to_string(),
        messages: request
            .messages
            .iter()
            .map(|m: &ChatMessage| ApiMessage {
                role: match m.role {
                    ChatRole::User => "user".to_string(),
                    ChatRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect(),
        system: request.system.clone(),
        max_tokens: request.max_tokens.unwrap_or(1024),
        temperature: request.temperature,
    }
}

#[async_trait]
impl Adapter for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
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
impl CompletionAdapter for AnthropicClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, TidingsError> {
        let wire = to_wire_request(&self.model, &request);
        let response = self.send_message(&wire).await?;
        Ok(CompletionResponse {
            text: response.text(),
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<(serde_json::Value, TokenUsage), TidingsError> {
        let first = self.complete(request.clone()).await?;
        let mut usage = first.usage;

        match parse_against_schema(&first.text, schema) {
            Ok(value) => return Ok((value, usage)),
            Err(violation) => {
                warn!(violation = %violation, "structured output mismatch, sending repair instruction");
                let mut repair = request;
                repair.messages.push(ChatMessage::assistant(first.text));
                repair.messages.push(ChatMessage::user(format!(
                    "The previous reply did not match the required format ({violation}). \
                     Respond again with ONLY a JSON object with fields: {}.",
                    schema.describe()
                )));

                let second = self.complete(repair).await?;
                usage.input_tokens += second.usage.input_tokens;
                usage.output_tokens += second.usage.output_tokens;

                match parse_against_schema(&second.text, schema) {
                    Ok(value) => Ok((value, usage)),
                    Err(violation) => Err(TidingsError::UnstructuredOutput(violation)),
                }
            }
        }
    }
}

/// Extracts a JSON object from model text and validates it against the schema.
fn parse_against_schema(
    text: &str,
    schema: &OutputSchema,
) -> Result<serde_json::Value, String> {
    let value =
        extract_json_object(text).ok_or_else(|| "no JSON object in reply".to_string())?;
    schema.check(&value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_core::traits::FieldSpec;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> AnthropicClient {
        AnthropicClient::new(
            Some("test-api-key".into()),
            "2023-06-01".into(),
            "claude-sonnet-4-20250514".into(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(base_url.to_string())
    }

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            system: Some("You are terse.".into()),
            messages: vec![ChatMessage::user("Hello")],
            temperature: Some(0.3),
            max_tokens: Some(256),
        }
    }

    fn text_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn complete_returns_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Hi there!")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.complete(test_request()).await.unwrap();
        assert_eq!(result.text, "Hi there!");
        assert_eq!(result.usage.input_tokens, 10);
        assert_eq!(result.usage.output_tokens, 5);
    }

    #[tokio::test]
    async fn complete_retries_once_on_429() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"type": "rate_limit_error", "message": "Rate limited"}
        });

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(&error_body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("After retry")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.complete(test_request()).await.unwrap();
        assert_eq!(result.text, "After retry");
    }

    #[tokio::test]
    async fn complete_maps_exhausted_429_to_rate_limited() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"type": "rate_limit_error", "message": "Rate limited"}
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(&error_body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.complete(test_request()).await.unwrap_err();
        assert_eq!(err.kind(), "provider_rate_limited");
    }

    #[tokio::test]
    async fn complete_maps_prompt_too_long_to_context_overflow() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {
                "type": "invalid_request_error",
                "message": "prompt is too long: 250000 tokens > 200000 maximum"
            }
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.complete(test_request()).await.unwrap_err();
        assert_eq!(err.kind(), "context_overflow");
    }

    #[tokio::test]
    async fn structured_output_repairs_then_succeeds() {
        let server = MockServer::start().await;
        let schema = OutputSchema {
            fields: vec![("headline".to_string(), FieldSpec::Text)],
        };

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_body("not json at all")),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_body(r#"{"headline": "Fixed"}"#)),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let (value, usage) = client
            .complete_structured(test_request(), &schema)
            .await
            .unwrap();
        assert_eq!(value["headline"], "Fixed");
        // Usage accumulates across the repair round trip.
        assert_eq!(usage.input_tokens, 20);
    }

    #[tokio::test]
    async fn structured_output_fails_after_one_repair() {
        let server = MockServer::start().await;
        let schema = OutputSchema {
            fields: vec![("headline".to_string(), FieldSpec::Text)],
        };
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("still prose")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .complete_structured(test_request(), &schema)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unstructured_output");
    }
}
