// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polarity lexicon for the sentiment scorer.
//!
//! Word lists are tuned for news copy: market movement, policy, and
//! incident vocabulary rather than product-review adjectives.

/// Words counted toward positive polarity.
pub const POSITIVE: &[&str] = &[
    "advance",
    "agreement",
    "approval",
    "backing",
    "benefit",
    "boom",
    "boost",
    "breakthrough",
    "celebrate",
    "champion",
    "confidence",
    "cure",
    "discovery",
    "expand",
    "expansion",
    "favorable",
    "gain",
    "gains",
    "growth",
    "hope",
    "improve",
    "improved",
    "improvement",
    "innovation",
    "landmark",
    "milestone",
    "optimism",
    "optimistic",
    "peace",
    "praise",
    "profit",
    "progress",
    "promising",
    "prosperity",
    "rally",
    "rebound",
    "record",
    "recovery",
    "relief",
    "rescue",
    "rise",
    "rises",
    "soar",
    "soars",
    "stability",
    "strong",
    "succeed",
    "success",
    "successful",
    "support",
    "surge",
    "thrive",
    "triumph",
    "upbeat",
    "victory",
    "win",
    "wins",
];

/// Words counted toward negative polarity.
pub const NEGATIVE: &[&str] = &[
    "accident",
    "attack",
    "bankruptcy",
    "blow",
    "breach",
    "collapse",
    "concern",
    "concerns",
    "conflict",
    "crash",
    "crisis",
    "criticism",
    "cut",
    "cuts",
    "damage",
    "danger",
    "death",
    "deaths",
    "decline",
    "declines",
    "deficit",
    "disaster",
    "dispute",
    "downturn",
    "drop",
    "drops",
    "failure",
    "fall",
    "falls",
    "fear",
    "fears",
    "fraud",
    "injury",
    "instability",
    "layoff",
    "layoffs",
    "loss",
    "losses",
    "outage",
    "panic",
    "plunge",
    "plunges",
    "recession",
    "risk",
    "risks",
    "scandal",
    "shortage",
    "shutdown",
    "slump",
    "strike",
    "threat",
    "turmoil",
    "violence",
    "war",
    "warning",
    "weak",
    "worsen",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicons_are_lowercase_and_disjoint() {
        for word in POSITIVE.iter().chain(NEGATIVE.iter()) {
            assert_eq!(*word, word.to_lowercase(), "lexicon entries must be lowercase");
        }
        let positive: std::collections::HashSet<_> = POSITIVE.iter().collect();
        assert!(
            NEGATIVE.iter().all(|w| !positive.contains(w)),
            "no word may appear in both lists"
        );
    }
}
