// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The retrieval engine: hybrid recall with user-profile re-ranking.
//!
//! Recall pulls the top 3k chunks by vector similarity, unioned with a
//! keyword/BM25 pass when the filter is broad. Hits are re-ranked by
//!
//!   score = 0.6 * cosine + 0.25 * recencyDecay
//!         + 0.15 * personalizationLevel * cosine(chunk, interestVector)
//!
//! then collapsed so each article contributes its best chunk.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tidings_core::TidingsError;
use tidings_core::traits::EmbeddingAdapter;
use tidings_core::types::{Fingerprint, RetrievedChunk, UserProfile, recency_decay};
use tidings_index::{IndexFilter, VectorHit, VectorIndex, cosine_similarity, normalize};
use tidings_store::DocumentStore;
use tracing::{debug, warn};

/// Warning tag set when the similarity floor leaves fewer than two hits.
pub const LOW_RECALL: &str = "LowRecall";

/// Options for one retrieval call.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Number of results to return.
    pub k: usize,
    pub filter: IndexFilter,
    /// Similarity floor; the engine default applies when absent.
    pub floor: Option<f32>,
    /// Profile for the personalization term.
    pub profile: Option<UserProfile>,
    /// Pre-computed query embedding (dialogue sessions cache this).
    pub query_vector: Option<Vec<f32>>,
}

/// Result of one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    /// Fewer than two hits survived the floor.
    pub low_recall: bool,
    /// The (normalized) query embedding, for caller-side caching.
    pub query_vector: Vec<f32>,
}

/// Index queries that outlive this bound indicate a wedged database, not
/// a slow query.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Hybrid vector + keyword retrieval with re-ranking.
pub struct RetrievalEngine {
    index: VectorIndex,
    store: DocumentStore,
    embedder: Arc<dyn EmbeddingAdapter>,
    default_floor: f32,
    query_timeout: std::time::Duration,
}

impl RetrievalEngine {
    pub fn new(
        index: VectorIndex,
        store: DocumentStore,
        embedder: Arc<dyn EmbeddingAdapter>,
        default_floor: f32,
    ) -> Self {
        Self {
            index,
            store,
            embedder,
            default_floor,
            query_timeout: QUERY_TIMEOUT,
        }
    }

    /// Overrides the vector-query timeout (config-driven).
    pub fn with_query_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Retrieves the top `k` chunks supporting `query_text`.
    pub async fn retrieve(
        &self,
        query_text: &str,
        opts: RetrieveOptions,
    ) -> Result<RetrievalResult, TidingsError> {
        let k = opts.k.max(1);
        let floor = opts.floor.unwrap_or(self.default_floor);

        let query_vector = match opts.query_vector {
            Some(v) => v,
            None => {
                let mut vectors = self.embedder.embed(&[query_text.to_string()]).await?;
                let mut v = vectors.pop().ok_or_else(|| {
                    TidingsError::InvalidResponse {
                        provider: "embeddings".into(),
                        message: "query embedding missing".into(),
                    }
                })?;
                normalize(&mut v);
                v
            }
        };

        // Recall: vector pass, deep enough to survive collapsing.
        let mut hits = tokio::time::timeout(
            self.query_timeout,
            self.index
                .query_by_vector(query_vector.clone(), 3 * k, opts.filter.clone()),
        )
        .await
        .map_err(|_| TidingsError::DeadlineExceeded {
            seconds: self.query_timeout.as_secs(),
        })??;

        // Keyword union only when the filter is broad; a run-scoped filter
        // is already small and precise.
        if opts.filter.is_broad() {
            match tokio::time::timeout(
                self.query_timeout,
                self.index
                    .search_keyword(query_text, query_vector.clone(), 3 * k),
            )
            .await
            {
                Ok(Ok(keyword_hits)) => union_hits(&mut hits, keyword_hits),
                Ok(Err(e)) => warn!(error = %e, "keyword pass failed, continuing vector-only"),
                Err(_) => warn!("keyword pass timed out, continuing vector-only"),
            }
        }

        // Floor applies to raw similarity, before blending.
        hits.retain(|h| h.score >= floor);
        let low_recall = hits.len() < 2;

        // Re-rank and collapse to each article's best chunk.
        let now = Utc::now();
        let personalization = opts
            .profile
            .as_ref()
            .map(|p| (p.style.personalization_level, p.interest_vector.clone()));

        let mut best: HashMap<Fingerprint, (f32, VectorHit)> = HashMap::new();
        for hit in hits {
            let mut score = 0.6 * hit.score + 0.25 * recency_decay(hit.published_at, now);
            if let Some((level, interest)) = &personalization
                && interest.len() == hit.vector.len()
                && !interest.is_empty()
            {
                score += 0.15 * level * cosine_similarity(&hit.vector, interest);
            }
            match best.get(&hit.article) {
                Some((existing, _)) if *existing >= score => {}
                _ => {
                    best.insert(hit.article, (score, hit));
                }
            }
        }

        let mut ranked: Vec<(f32, VectorHit)> = best.into_values().collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);

        // Attribution: join article title/URL from the document store.
        let fps: Vec<Fingerprint> = ranked.iter().map(|(_, h)| h.article).collect();
        let articles = self.store.get_by_fingerprints(&fps).await?;
        let by_fp: HashMap<Fingerprint, _> = articles
            .into_iter()
            .map(|a| (a.fingerprint, a))
            .collect();

        let chunks: Vec<RetrievedChunk> = ranked
            .into_iter()
            .map(|(score, hit)| {
                let article = by_fp.get(&hit.article);
                RetrievedChunk {
                    article: hit.article,
                    ordinal: hit.ordinal,
                    text: hit.text,
                    title: article.map(|a| a.title.clone()).unwrap_or_default(),
                    url: article.and_then(|a| a.url.clone()),
                    source: hit.source,
                    published_at: hit.published_at,
                    score,
                    similarity: hit.score,
                }
            })
            .collect();

        debug!(
            query = query_text,
            returned = chunks.len(),
            low_recall,
            "retrieval finished"
        );
        Ok(RetrievalResult {
            chunks,
            low_recall,
            query_vector,
        })
    }
}

/// Unions keyword hits into the vector hit list, keyed by (article,
/// ordinal). Scores are cosine on both sides, so the max wins.
fn union_hits(hits: &mut Vec<VectorHit>, keyword_hits: Vec<VectorHit>) {
    let seen: std::collections::HashSet<(Fingerprint, u32)> =
        hits.iter().map(|h| (h.article, h.ordinal)).collect();
    for hit in keyword_hits {
        if !seen.contains(&(hit.article, hit.ordinal)) {
            hits.push(hit);
        }
    }
}
