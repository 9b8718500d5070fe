// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source credibility scores in [0, 1].
//!
//! A small curated table of wire services and major outlets; everything
//! unknown lands on a middle default. Matching is case-insensitive on a
//! normalized outlet name.

/// Default for sources absent from the table.
const DEFAULT_CREDIBILITY: f32 = 0.5;

const KNOWN_SOURCES: &[(&str, f32)] = &[
    ("associated press", 0.95),
    ("reuters", 0.95),
    ("afp", 0.9),
    ("bbc", 0.9),
    ("bbc news", 0.9),
    ("bloomberg", 0.9),
    ("financial times", 0.9),
    ("nature", 0.9),
    ("science", 0.9),
    ("the economist", 0.9),
    ("the new york times", 0.88),
    ("the wall street journal", 0.88),
    ("the washington post", 0.85),
    ("the guardian", 0.85),
    ("npr", 0.85),
    ("axios", 0.8),
    ("cnbc", 0.8),
    ("politico", 0.8),
    ("ars technica", 0.78),
    ("wired", 0.75),
    ("techcrunch", 0.7),
    ("the verge", 0.7),
    ("business insider", 0.6),
];

/// Credibility for an outlet name.
pub fn source_credibility(source: &str) -> f32 {
    let normalized = source.trim().to_lowercase();
    if normalized.is_empty() {
        return DEFAULT_CREDIBILITY;
    }
    for (name, score) in KNOWN_SOURCES {
        if normalized == *name {
            return *score;
        }
    }
    // Self-published platforms rank below the unknown default.
    if normalized.contains("blog") || normalized.contains("medium.com") {
        return 0.35;
    }
    DEFAULT_CREDIBILITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_services_score_highest() {
        assert_eq!(source_credibility("Reuters"), 0.95);
        assert_eq!(source_credibility("  associated press "), 0.95);
    }

    #[test]
    fn unknown_sources_get_the_default() {
        assert_eq!(source_credibility("Smalltown Gazette"), 0.5);
        assert_eq!(source_credibility(""), 0.5);
    }

    #[test]
    fn blogs_score_below_default() {
        assert!(source_credibility("Someone's Tech Blog") < 0.5);
    }
}
