// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The embedding indexer: chunk -> embed -> upsert.
//!
//! Embedding calls run in batches of at most the configured size (<= 32).
//! One failed batch does not fail the article: chunks from successful
//! batches are still upserted and the article is marked partially indexed.

use std::sync::Arc;

use tidings_core::TidingsError;
use tidings_core::traits::EmbeddingAdapter;
use tidings_core::types::{Article, EmbeddedChunk};
use tracing::{debug, warn};

use crate::chunker::chunk_article;
use crate::store::{ChunkMetadata, VectorIndex};
use crate::types::normalize;

/// Result of indexing one article.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOutcome {
    /// Chunks written to the index in this call.
    pub chunks_indexed: usize,
    /// The article already had chunks and re-embedding was not requested.
    pub skipped: bool,
    /// At least one embedding batch failed; the rest was indexed.
    pub partially_indexed: bool,
}

/// Chunks articles, embeds the chunks, and upserts vectors into the index.
pub struct EmbeddingIndexer {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingAdapter>,
    batch_size: usize,
}

impl EmbeddingIndexer {
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn EmbeddingAdapter>,
        batch_size: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            batch_size: batch_size.clamp(1, 32),
        }
    }

    /// The underlying vector index.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Indexes one article.
    ///
    /// Without `reembed`, an article that already has chunks is skipped so
    /// identical pipeline runs write identical vector sets. With `reembed`,
    /// prior chunks are deleted atomically before the new generation lands.
    pub async fn index_article(
        &self,
        article: &Article,
        reembed: bool,
    ) -> Result<IndexOutcome, TidingsError> {
        if !reembed && self.index.has_article(article.fingerprint).await? {
            debug!(article = %article.fingerprint, "already indexed, skipping");
            return Ok(IndexOutcome {
                skipped: true,
                ..IndexOutcome::default()
            });
        }

        let chunks = chunk_article(article);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let mut embedded: Vec<EmbeddedChunk> = Vec::with_capacity(chunks.len());
        let mut failed_batches = 0usize;
        let mut last_error: Option<TidingsError> = None;

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            match self.embedder.embed(batch).await {
                Ok(vectors) => {
                    let offset = batch_index * self.batch_size;
                    for (i, mut vector) in vectors.into_iter().enumerate() {
                        normalize(&mut vector);
                        embedded.push(EmbeddedChunk {
                            chunk: chunks[offset + i].clone(),
                            vector,
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        article = %article.fingerprint,
                        batch = batch_index,
                        error = %e,
                        "embedding batch failed"
                    );
                    failed_batches += 1;
                    last_error = Some(e);
                }
            }
        }

        if embedded.is_empty() {
            // Every batch failed; surface the provider error.
            return Err(last_error.unwrap_or_else(|| {
                TidingsError::Internal("article produced no chunks".into())
            }));
        }

        let written = self
            .index
            .upsert_chunks(
                article.fingerprint,
                embedded,
                ChunkMetadata {
                    published_at: article.published_at,
                    source: article.source.clone(),
                    category: article.category.clone(),
                },
            )
            .await?;

        Ok(IndexOutcome {
            chunks_indexed: written,
            skipped: false,
            partially_indexed: failed_batches > 0,
        })
    }
}
