// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic mock embedding adapter.
//!
//! Vectors are derived from word hashes, so texts sharing vocabulary land
//! near each other in the mock space and an article's title embeds close
//! to its own title+summary chunk. No randomness, no network.

use async_trait::async_trait;
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, EmbeddingAdapter, HealthStatus};

/// Output dimension of the mock space.
pub const MOCK_DIMENSION: usize = 16;

/// A deterministic hash-bucket embedder.
pub struct MockEmbedder {
    fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// Fails every call with `ProviderUnavailable` (outage scenarios).
    pub fn failing() -> Self {
        Self { fail: true }
    }

    fn embed_one(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; MOCK_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hash: u32 = 2_166_136_261;
            for b in word.to_lowercase().bytes() {
                hash ^= b as u32;
                hash = hash.wrapping_mul(16_777_619);
            }
            vector[(hash as usize) % MOCK_DIMENSION] += 1.0;
        }
        // Normalize so cosine comparisons behave like the real provider.
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        if self.fail {
            Ok(HealthStatus::Unhealthy("configured to fail".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, TidingsError> {
        if self.fail {
            return Err(TidingsError::ProviderUnavailable {
                provider: "embeddings".into(),
                message: "mock embedder outage".into(),
                source: None,
            });
        }
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        MOCK_DIMENSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_texts_embed_identically() {
        let embedder = MockEmbedder::new();
        let vectors = embedder
            .embed(&["quantum computing".to_string(), "quantum computing".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn overlapping_vocabulary_scores_higher_than_disjoint() {
        let embedder = MockEmbedder::new();
        let vectors = embedder
            .embed(&[
                "quantum computing breakthrough".to_string(),
                "quantum computing record results".to_string(),
                "football season opener tonight".to_string(),
            ])
            .await
            .unwrap();
        let dot = |a: &[f32], b: &[f32]| -> f32 {
            a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
        };
        let related = dot(&vectors[0], &vectors[1]);
        let unrelated = dot(&vectors[0], &vectors[2]);
        assert!(related > unrelated);
        assert!(related > 0.5);
    }
}
