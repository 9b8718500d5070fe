// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline orchestration for Tidings.
//!
//! Composes the search adapter, article store, embedding indexer,
//! sentiment scorer, LLM analysis, card synthesizer, and user memory into
//! one staged job with per-stage outcome records, an overall deadline,
//! and per-user admission control.

pub mod admission;
pub mod analysis;
pub mod orchestrator;

pub use admission::AdmissionControl;
pub use orchestrator::Orchestrator;
