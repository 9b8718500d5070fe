// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters and a full-stack test harness for Tidings.
//!
//! Everything here is deterministic and CI-runnable: in-memory SQLite,
//! hash-derived mock embeddings, FIFO mock LLM responses, and canned
//! search results.

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;
pub mod mock_search;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::{MOCK_DIMENSION, MockEmbedder};
pub use mock_provider::MockProvider;
pub use mock_search::MockSearch;
