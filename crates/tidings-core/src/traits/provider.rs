// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion adapter trait for LLM providers.
//!
//! The client owns no domain prompts; it receives fully composed messages.
//! Prompt templates live with their consumers (card synthesis, dialogue).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TidingsError;
use crate::traits::adapter::Adapter;

/// Role of a chat message sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A fully composed completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Token usage returned for accounting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A completed response with usage accounting.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Expected field shape for structured completions.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    /// A non-empty string field.
    Text,
    /// An array of strings with an inclusive length range.
    TextArray { min: usize, max: usize },
}

/// A caller-provided schema a structured completion must satisfy.
///
/// Deliberately smaller than JSON Schema: the consumers here only ever
/// demand flat objects of strings and string arrays.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub fields: Vec<(String, FieldSpec)>,
}

impl OutputSchema {
    /// Validates `value` against this schema, returning the first violation.
    pub fn check(&self, value: &serde_json::Value) -> Result<(), String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "expected a JSON object".to_string())?;
        for (name, spec) in &self.fields {
            let field = obj
                .get(name)
                .ok_or_else(|| format!("missing field `{name}`"))?;
            match spec {
                FieldSpec::Text => {
                    let s = field
                        .as_str()
                        .ok_or_else(|| format!("field `{name}` must be a string"))?;
                    if s.trim().is_empty() {
                        return Err(format!("field `{name}` must be non-empty"));
                    }
                }
                FieldSpec::TextArray { min, max } => {
                    let arr = field
                        .as_array()
                        .ok_or_else(|| format!("field `{name}` must be an array"))?;
                    if arr.len() < *min || arr.len() > *max {
                        return Err(format!(
                            "field `{name}` must have {min}..={max} items, got {}",
                            arr.len()
                        ));
                    }
                    if !arr.iter().all(|v| v.is_string()) {
                        return Err(format!("field `{name}` must contain only strings"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Human-readable description of the schema, usable in a repair prompt.
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|(name, spec)| match spec {
                FieldSpec::Text => format!("\"{name}\": string"),
                FieldSpec::TextArray { min, max } => {
                    format!("\"{name}\": array of {min}-{max} strings")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Adapter for LLM chat-completion providers.
#[async_trait]
pub trait CompletionAdapter: Adapter {
    /// Sends a completion request and returns the full response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, TidingsError>;

    /// Sends a completion request that must yield a JSON object matching
    /// `schema`. Implementations validate the response and retry once with
    /// a repair instruction before failing `UnstructuredOutput`.
    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: &OutputSchema,
    ) -> Result<(serde_json::Value, TokenUsage), TidingsError>;
}
