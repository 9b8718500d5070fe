// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! News card synthesis for the Tidings pipeline.
//!
//! Deterministic importance ranking over the run's articles, followed by a
//! structured LLM extraction per selected article.

pub mod credibility;
pub mod importance;
pub mod synthesizer;

pub use credibility::source_credibility;
pub use importance::{importance, profile_affinity};
pub use synthesizer::{CARD_GENERATION_DEGRADED, CardSynthesizer, SynthesisResult};
