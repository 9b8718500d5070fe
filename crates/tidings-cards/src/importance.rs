// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic importance scoring for card selection.
//!
//! importance = 0.45 * recencyDecay + 0.25 * sourceCredibility
//!            + 0.20 * sentimentMagnitude + 0.10 * profileAffinity
//!
//! scaled into [0, 100]. The affinity term is zero without a profile.

use chrono::{DateTime, Utc};
use tidings_core::types::{Article, Sentiment, UserProfile, recency_decay};

use crate::credibility::source_credibility;

/// How strongly an article matches the user's learned preferences, in
/// [0, 1]. Category weight carries most of the signal; a preferred source
/// adds a fixed boost.
pub fn profile_affinity(article: &Article, profile: Option<&UserProfile>) -> f32 {
    let Some(profile) = profile else {
        return 0.0;
    };
    let category = profile
        .category_weights
        .get(&article.category)
        .copied()
        .unwrap_or(0.0);
    let source_boost = if profile
        .preferred_sources
        .iter()
        .any(|s| s.eq_ignore_ascii_case(&article.source))
    {
        0.3
    } else {
        0.0
    };
    (category + source_boost).clamp(0.0, 1.0)
}

/// The blended importance score in [0, 100].
pub fn importance(
    article: &Article,
    sentiment: &Sentiment,
    profile: Option<&UserProfile>,
    now: DateTime<Utc>,
) -> f32 {
    let blend = 0.45 * recency_decay(article.published_at, now)
        + 0.25 * source_credibility(&article.source)
        + 0.20 * sentiment.magnitude
        + 0.10 * profile_affinity(article, profile);
    blend * 100.0
}
