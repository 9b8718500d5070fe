// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentiment scoring for the Tidings pipeline.
//!
//! A local lexicon classifier: no provider round-trip, deterministic
//! output, and cheap enough to run inline on the pipeline task.

pub mod lexicon;
pub mod scorer;

pub use scorer::SentimentScorer;
