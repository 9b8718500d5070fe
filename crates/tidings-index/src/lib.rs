// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding indexing for the Tidings pipeline.
//!
//! Chunks articles, embeds the chunks in bounded batches, and maintains
//! the SQLite vector index (BLOB vectors + FTS5 keyword shadow) that the
//! retrieval engine queries.

pub mod chunker;
pub mod indexer;
pub mod store;
pub mod types;

pub use indexer::{EmbeddingIndexer, IndexOutcome};
pub use store::{ChunkMetadata, VectorIndex};
pub use types::{IndexFilter, VectorHit, cosine_similarity, normalize};
