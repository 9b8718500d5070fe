// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::TidingsError;
use crate::traits::adapter::Adapter;

/// Adapter for generating vector embeddings from text.
///
/// Embedding adapters power article indexing, retrieval, and the user
/// interest vector.
#[async_trait]
pub trait EmbeddingAdapter: Adapter {
    /// Generates one embedding per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TidingsError>;

    /// Fixed output dimension of this adapter's vectors.
    fn dimension(&self) -> usize;
}
