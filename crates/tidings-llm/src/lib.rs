// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM provider clients for the Tidings pipeline.
//!
//! Provides [`AnthropicClient`] for chat completions (with structured-output
//! enforcement) and [`EmbeddingClient`] for vector embeddings. Both clients
//! own no domain prompts -- prompt templates live with their consumers.

pub mod client;
pub mod embeddings;
pub mod limits;
pub mod structured;
pub mod types;

pub use client::AnthropicClient;
pub use embeddings::EmbeddingClient;
pub use limits::{LimitedCompletion, LimitedEmbedding};
