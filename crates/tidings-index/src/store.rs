// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector index with BLOB vectors and FTS5 for keyword recall.
//!
//! Rides the document store's connection; the chunks table and its FTS5
//! shadow are created by the store's migrations. Vectors are L2-normalized
//! before they reach this layer, so similarity is a dot product.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, HealthStatus};
use tidings_core::types::{EmbeddedChunk, Fingerprint};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::types::{IndexFilter, VectorHit, blob_to_vec, cosine_similarity, vec_to_blob};

/// Converts a tokio-rusqlite error into the index taxonomy.
fn index_err(e: tokio_rusqlite::Error) -> TidingsError {
    TidingsError::IndexUnavailable {
        source: Box::new(e),
    }
}

/// Persistent vector index over article chunks.
#[derive(Clone)]
pub struct VectorIndex {
    conn: Connection,
}

/// Metadata stored alongside each chunk's vector.
#[derive(Debug, Clone)]
pub struct ChunkMetadata {
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub category: String,
}

impl VectorIndex {
    /// Wraps an existing connection. The connection must already have the
    /// chunks migration applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// True when the article already has indexed chunks.
    pub async fn has_article(&self, article: Fingerprint) -> Result<bool, TidingsError> {
        let fp = article.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM chunks WHERE article = ?1",
                    params![fp],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(index_err)
    }

    /// Atomically replaces all of an article's chunks with the given set.
    ///
    /// Prior chunks are deleted and the new ones inserted in one
    /// transaction, so a re-index can never leave a mixed generation.
    pub async fn upsert_chunks(
        &self,
        article: Fingerprint,
        chunks: Vec<EmbeddedChunk>,
        metadata: ChunkMetadata,
    ) -> Result<usize, TidingsError> {
        let fp = article.to_string();
        let count = chunks.len();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM chunks WHERE article = ?1", params![fp])?;
                for embedded in &chunks {
                    tx.execute(
                        "INSERT INTO chunks
                         (article, ordinal, text, token_count, field, embedding,
                          published_at, source, category)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            fp,
                            embedded.chunk.ordinal,
                            embedded.chunk.text,
                            embedded.chunk.token_count,
                            embedded.chunk.field.to_string(),
                            vec_to_blob(&embedded.vector),
                            metadata.published_at.to_rfc3339(),
                            metadata.source,
                            metadata.category,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(index_err)?;
        debug!(article = %article, chunks = count, "chunks upserted");
        Ok(count)
    }

    /// Deletes all chunks belonging to an article.
    pub async fn delete_article(&self, article: Fingerprint) -> Result<usize, TidingsError> {
        let fp = article.to_string();
        self.conn
            .call(move |conn| {
                let deleted =
                    conn.execute("DELETE FROM chunks WHERE article = ?1", params![fp])?;
                Ok(deleted)
            })
            .await
            .map_err(index_err)
    }

    /// Total chunks currently indexed (diagnostics and tests).
    pub async fn chunk_count(&self) -> Result<usize, TidingsError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(index_err)
    }

    /// Top-k chunks by cosine similarity against a pre-normalized query
    /// vector, under the given filter.
    pub async fn query_by_vector(
        &self,
        query: Vec<f32>,
        k: usize,
        filter: IndexFilter,
    ) -> Result<Vec<VectorHit>, TidingsError> {
        self.conn
            .call(move |conn| {
                let (sql, filter_params) = candidate_sql(&filter);
                let mut stmt = conn.prepare(&sql)?;
                let refs: Vec<&dyn rusqlite::ToSql> =
                    filter_params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

                let mut hits: Vec<VectorHit> = stmt
                    .query_map(refs.as_slice(), |row| {
                        let fp: String = row.get(0)?;
                        let blob: Vec<u8> = row.get(3)?;
                        let published_at: String = row.get(4)?;
                        Ok((fp, row.get::<_, u32>(1)?, row.get::<_, String>(2)?, blob, published_at, row.get::<_, String>(5)?))
                    })?
                    .filter_map(|r| r.ok())
                    .filter_map(|(fp, ordinal, text, blob, published_at, source)| {
                        let vector = blob_to_vec(&blob);
                        if vector.len() != query.len() {
                            return None;
                        }
                        Some(VectorHit {
                            article: Fingerprint(fp.parse().unwrap_or_default()),
                            ordinal,
                            text,
                            score: cosine_similarity(&query, &vector),
                            published_at: published_at
                                .parse::<DateTime<Utc>>()
                                .unwrap_or_default(),
                            source,
                            vector,
                        })
                    })
                    .collect();

                hits.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                hits.truncate(k);
                Ok(hits)
            })
            .await
            .map_err(index_err)
    }

    /// Keyword/BM25 recall over chunk text. Each hit's `score` is its true
    /// cosine similarity against `query_vector`, so keyword hits blend into
    /// vector re-ranking on the same scale.
    pub async fn search_keyword(
        &self,
        query: &str,
        query_vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<VectorHit>, TidingsError> {
        let match_expr = fts_match_expression(query);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.article, c.ordinal, c.text, c.embedding, c.published_at, c.source
                     FROM chunks_fts
                     JOIN chunks c ON c.rowid = chunks_fts.rowid
                     WHERE chunks_fts MATCH ?1
                     ORDER BY bm25(chunks_fts)
                     LIMIT ?2",
                )?;
                let hits = stmt
                    .query_map(params![match_expr, limit as i64], |row| {
                        let fp: String = row.get(0)?;
                        let blob: Vec<u8> = row.get(3)?;
                        let published_at: String = row.get(4)?;
                        Ok((fp, row.get::<_, u32>(1)?, row.get::<_, String>(2)?, blob, published_at, row.get::<_, String>(5)?))
                    })?
                    .filter_map(|r| r.ok())
                    .map(|(fp, ordinal, text, blob, published_at, source)| {
                        let vector = blob_to_vec(&blob);
                        let score = if vector.len() == query_vector.len() {
                            cosine_similarity(&query_vector, &vector)
                        } else {
                            0.0
                        };
                        VectorHit {
                            article: Fingerprint(fp.parse().unwrap_or_default()),
                            ordinal,
                            text,
                            score,
                            published_at: published_at
                                .parse::<DateTime<Utc>>()
                                .unwrap_or_default(),
                            source,
                            vector,
                        }
                    })
                    .collect::<Vec<_>>();
                Ok(hits)
            })
            .await
            .map_err(index_err)
    }
}

/// Builds the candidate SELECT for a vector query under `filter`.
fn candidate_sql(filter: &IndexFilter) -> (String, Vec<String>) {
    let mut sql = String::from(
        "SELECT article, ordinal, text, embedding, published_at, source FROM chunks WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(articles) = &filter.articles {
        if articles.is_empty() {
            sql.push_str(" AND 0=1");
        } else {
            let placeholders: Vec<String> = articles
                .iter()
                .map(|fp| {
                    params_vec.push(fp.to_string());
                    format!("?{}", params_vec.len())
                })
                .collect();
            sql.push_str(&format!(" AND article IN ({})", placeholders.join(", ")));
        }
    }
    if let Some(after) = filter.published_after {
        params_vec.push(after.to_rfc3339());
        sql.push_str(&format!(" AND published_at >= ?{}", params_vec.len()));
    }
    (sql, params_vec)
}

/// Quotes each search term so user text cannot inject FTS5 syntax.
fn fts_match_expression(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| term.replace('"', ""))
        .filter(|term| term.len() > 1)
        .map(|term| format!("\"{term}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[async_trait]
impl Adapter for VectorIndex {
    fn name(&self) -> &str {
        "index"
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("SELECT COUNT(*) FROM chunks;")?;
                Ok(())
            })
            .await
            .map_err(index_err)?;
        Ok(HealthStatus::Healthy)
    }
}
