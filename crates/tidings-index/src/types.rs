// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector helpers and the index-side result/filter types.

use chrono::{DateTime, Utc};
use tidings_core::types::Fingerprint;

/// Convert an f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// L2-normalizes a vector in place. Zero vectors are left untouched.
pub fn normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON && norm.is_finite() {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two same-length vectors.
///
/// Vectors are normalized once at write time, so this is a dot product.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Filter applied to index queries.
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    /// Restrict hits to these articles (e.g. the seeding pipeline run's).
    pub articles: Option<Vec<Fingerprint>>,
    /// Restrict hits to articles published after this instant.
    pub published_after: Option<DateTime<Utc>>,
}

impl IndexFilter {
    /// No restriction at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Restrict to a fixed article set.
    pub fn for_articles(articles: Vec<Fingerprint>) -> Self {
        Self {
            articles: Some(articles),
            published_after: None,
        }
    }

    /// A broad filter has no explicit article set, which makes the keyword
    /// recall pass worthwhile.
    pub fn is_broad(&self) -> bool {
        self.articles.is_none()
    }
}

/// One hit from a vector or keyword query.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub article: Fingerprint,
    pub ordinal: u32,
    pub text: String,
    /// Cosine similarity against the query vector.
    pub score: f32,
    pub published_at: DateTime<Utc>,
    pub source: String,
    /// The chunk's stored (normalized) vector, for downstream re-ranking.
    pub vector: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip_preserves_values() {
        let original = vec![0.1_f32, -0.5, 2.0, 0.0];
        let recovered = blob_to_vec(&vec_to_blob(&original));
        assert_eq!(original, recovered);
    }

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut v = vec![0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let mut v = vec![1.0, 2.0, 2.0];
        normalize(&mut v);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn broad_filter_detection() {
        assert!(IndexFilter::none().is_broad());
        assert!(!IndexFilter::for_articles(vec![]).is_broad());
    }
}
