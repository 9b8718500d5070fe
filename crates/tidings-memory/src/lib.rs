// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user memory for the Tidings pipeline.
//!
//! Records interactions against an append-only log and derives the
//! interest vector, category weights, and engagement counters that feed
//! personalization in retrieval and prompting.

pub mod memory;

pub use memory::{UserMemoryStore, top_categories};
