// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Article fingerprint computation.
//!
//! The store is the sole authority for article identity. A fingerprint is
//! a UUIDv5: over the lowercased canonical URL when one exists, otherwise
//! over title, source, and published day. The fallback hashes the UTC day
//! (not the instant) so same-day re-discoveries of URL-less records dedup.

use chrono::{DateTime, Utc};
use tidings_core::types::{Fingerprint, RawArticle};
use uuid::Uuid;

/// Computes the fingerprint for a raw article.
///
/// `discovered_at` anchors the fallback day when the provider gave no
/// publication date.
pub fn fingerprint_for(raw: &RawArticle, discovered_at: DateTime<Utc>) -> Fingerprint {
    if let Some(url) = raw.url.as_deref() {
        let canonical = url.trim().to_lowercase();
        if !canonical.is_empty() {
            return Fingerprint(Uuid::new_v5(&Uuid::NAMESPACE_URL, canonical.as_bytes()));
        }
    }
    let day = raw
        .published_at
        .unwrap_or(discovered_at)
        .date_naive()
        .to_string();
    let material = format!("{}\n{}\n{}", raw.title.trim(), raw.source.trim(), day);
    Fingerprint(Uuid::new_v5(&Uuid::NAMESPACE_OID, material.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, url: Option<&str>) -> RawArticle {
        RawArticle {
            title: title.to_string(),
            summary: String::new(),
            body: None,
            url: url.map(str::to_string),
            source: "Example Wire".to_string(),
            author: None,
            published_at: None,
            language: None,
            category: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn url_fingerprint_is_case_insensitive() {
        let now = Utc::now();
        let a = fingerprint_for(&raw("t", Some("https://example.com/Story")), now);
        let b = fingerprint_for(&raw("t", Some("HTTPS://EXAMPLE.COM/STORY")), now);
        assert_eq!(a, b);
    }

    #[test]
    fn url_wins_over_title_differences() {
        let now = Utc::now();
        let a = fingerprint_for(&raw("headline one", Some("https://example.com/x")), now);
        let b = fingerprint_for(&raw("headline two", Some("https://example.com/x")), now);
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_uses_title_source_and_day() {
        let day = "2026-07-30T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let later_same_day = "2026-07-30T23:59:00Z".parse::<DateTime<Utc>>().unwrap();
        let next_day = "2026-07-31T00:01:00Z".parse::<DateTime<Utc>>().unwrap();

        let a = fingerprint_for(&raw("headline", None), day);
        let b = fingerprint_for(&raw("headline", None), later_same_day);
        let c = fingerprint_for(&raw("headline", None), next_day);
        assert_eq!(a, b, "same-day rediscovery must dedup");
        assert_ne!(a, c, "a different day is a different identity");
    }

    #[test]
    fn empty_url_falls_back_to_hash() {
        let now = Utc::now();
        let a = fingerprint_for(&raw("headline", Some("   ")), now);
        let b = fingerprint_for(&raw("headline", None), now);
        assert_eq!(a, b);
    }
}
