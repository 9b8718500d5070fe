// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The RAG dialogue engine for Tidings.
//!
//! Serves follow-up questions grounded in the just-processed corpus and
//! the user's memory profile: retrieval-backed prompt assembly, strictly
//! serialized turns per session, and bounded history with LLM-summarized
//! pruning.

pub mod manager;
pub mod prompt;
pub mod pruning;

pub use manager::{ChatRequest, ChatResponse, DialogueManager, SourceRef};
