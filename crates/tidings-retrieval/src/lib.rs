// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval engine for the Tidings RAG dialogue surface.
//!
//! Hybrid recall over the vector index (with a keyword union on broad
//! filters), re-ranked by similarity, recency, and the user's interest
//! vector, collapsed to one best chunk per article.

pub mod engine;

pub use engine::{LOW_RECALL, RetrievalEngine, RetrievalResult, RetrieveOptions};
