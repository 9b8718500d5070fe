// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by provider and persistence components.

pub mod adapter;
pub mod embedding;
pub mod provider;
pub mod search;

pub use adapter::{Adapter, HealthStatus};
pub use embedding::EmbeddingAdapter;
pub use provider::{
    ChatMessage, ChatRole, CompletionAdapter, CompletionRequest, CompletionResponse,
    FieldSpec, OutputSchema, TokenUsage,
};
pub use search::{Lookback, SearchAdapter, SearchOptions};
