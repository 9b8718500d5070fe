// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexicon-based sentiment scoring.
//!
//! Inputs are capped at 2,000 characters; longer text is scored on its
//! first 1,000 plus last 500 characters. Verdicts below confidence 0.4
//! collapse to neutral.

use std::collections::HashSet;
use std::sync::LazyLock;

use tidings_core::types::{Sentiment, SentimentLabel};
use tracing::trace;

use crate::lexicon;

/// Confidence floor below which a verdict collapses to neutral.
const CONFIDENCE_FLOOR: f32 = 0.4;

/// Input cap and the head/tail split applied beyond it.
const INPUT_CAP: usize = 2_000;
const HEAD_CHARS: usize = 1_000;
const TAIL_CHARS: usize = 500;

static POSITIVE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| lexicon::POSITIVE.iter().copied().collect());
static NEGATIVE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| lexicon::NEGATIVE.iter().copied().collect());

/// Lexicon-backed sentiment scorer.
///
/// Pure CPU work; scoring a pipeline batch is a few microseconds per text,
/// so it runs inline on the task path.
#[derive(Debug, Clone, Default)]
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores a batch of texts, one verdict per input in order.
    pub fn score(&self, texts: &[String]) -> Vec<Sentiment> {
        texts.iter().map(|t| self.score_one(t)).collect()
    }

    /// Scores a single text.
    pub fn score_one(&self, text: &str) -> Sentiment {
        let capped = cap_input(text);
        let mut positive = 0u32;
        let mut negative = 0u32;

        for word in capped
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let lower = word.to_lowercase();
            if POSITIVE.contains(lower.as_str()) {
                positive += 1;
            } else if NEGATIVE.contains(lower.as_str()) {
                negative += 1;
            }
        }

        let hits = positive + negative;
        if hits == 0 {
            return Sentiment {
                label: SentimentLabel::Neutral,
                magnitude: 0.0,
                confidence: 0.0,
            };
        }

        // Dominance of the stronger polarity over all hits.
        let score = (positive as f32 - negative as f32) / hits as f32;
        let magnitude = score.abs();
        // Confidence grows with the amount of evidence: one hit is weak,
        // several concurring hits are strong.
        let confidence = (1.0 - 1.0 / (1.0 + hits as f32)) * magnitude.max(0.5);

        let label = if confidence < CONFIDENCE_FLOOR {
            SentimentLabel::Neutral
        } else if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        trace!(positive, negative, score, confidence, "scored text");
        Sentiment {
            label,
            magnitude,
            confidence: confidence.min(1.0),
        }
    }
}

/// Applies the input cap: texts beyond 2,000 chars are reduced to their
/// first 1,000 plus last 500 characters.
fn cap_input(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= INPUT_CAP {
        return text.to_string();
    }
    let head: String = chars[..HEAD_CHARS].iter().collect();
    let tail: String = chars[chars.len() - TAIL_CHARS..].iter().collect();
    format!("{head} {tail}")
}
