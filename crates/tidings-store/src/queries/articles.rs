// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Article CRUD: batched idempotent upsert, fingerprint lookups, and
//! tag/range filtering.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tidings_core::TidingsError;
use tidings_core::types::{Article, Fingerprint, RawArticle};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::fingerprint::fingerprint_for;

/// Outcome of a batched upsert.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// Articles as they now exist in the store, input order preserved.
    pub articles: Vec<Article>,
    /// Fingerprints in input order (deduped).
    pub fingerprints: Vec<Fingerprint>,
    pub stored: usize,
    pub duplicates: usize,
}

/// Filter for tag/range queries.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Match articles carrying ANY of these tags. Empty means no tag filter.
    pub tags: Vec<String>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub limit: usize,
}

const ARTICLE_COLUMNS: &str = "fingerprint, title, summary, body, url, source, author, \
     published_at, language, category, tags, query, discovered_at, last_seen_at";

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<Article> {
    let fingerprint: String = row.get(0)?;
    let tags_json: String = row.get(10)?;
    let published_at: String = row.get(7)?;
    let discovered_at: String = row.get(12)?;
    let last_seen_at: String = row.get(13)?;
    Ok(Article {
        fingerprint: Fingerprint(fingerprint.parse().unwrap_or_default()),
        title: row.get(1)?,
        summary: row.get(2)?,
        body: row.get(3)?,
        url: row.get(4)?,
        source: row.get(5)?,
        author: row.get(6)?,
        published_at: parse_ts(&published_at),
        language: row.get(8)?,
        category: row.get(9)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        query: row.get(11)?,
        discovered_at: parse_ts(&discovered_at),
        last_seen_at: parse_ts(&last_seen_at),
    })
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_default()
}

/// Batched idempotent upsert keyed by fingerprint.
///
/// New articles are inserted whole. Duplicates never overwrite title or
/// body, but tags are merged and `last_seen_at` is refreshed. The whole
/// batch commits in one transaction, so writes are durable before return.
pub async fn upsert_many(
    db: &Database,
    raws: Vec<RawArticle>,
    query: &str,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, TidingsError> {
    let query = query.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut articles = Vec::with_capacity(raws.len());
            let mut fingerprints = Vec::with_capacity(raws.len());
            let mut seen = BTreeSet::new();
            let mut stored = 0usize;
            let mut duplicates = 0usize;

            for raw in raws {
                let fp = fingerprint_for(&raw, now);
                if !seen.insert(fp) {
                    // Same identity twice within one batch.
                    duplicates += 1;
                    continue;
                }

                let existing = tx
                    .query_row(
                        &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE fingerprint = ?1"),
                        params![fp.to_string()],
                        row_to_article,
                    )
                    .optional()?;

                if let Some(mut article) = existing {
                    // Merge tags; identity fields stay untouched.
                    let mut tag_set: BTreeSet<String> =
                        article.tags.iter().cloned().collect();
                    tag_set.extend(raw.tags.iter().cloned());
                    article.tags = tag_set.into_iter().collect();
                    article.last_seen_at = now;

                    tx.execute(
                        "UPDATE articles SET tags = ?2, last_seen_at = ?3 WHERE fingerprint = ?1",
                        params![
                            fp.to_string(),
                            serde_json::to_string(&article.tags).unwrap_or_else(|_| "[]".into()),
                            now.to_rfc3339(),
                        ],
                    )?;
                    duplicates += 1;
                    fingerprints.push(fp);
                    articles.push(article);
                    continue;
                }

                // Clock skew guard: a publication instant may not run
                // ahead of discovery by more than an hour.
                let skew_cap = now + Duration::hours(1);
                let article = Article {
                    fingerprint: fp,
                    title: raw.title,
                    summary: raw.summary,
                    body: raw.body,
                    url: raw.url,
                    source: raw.source,
                    author: raw.author,
                    published_at: raw.published_at.unwrap_or(now).min(skew_cap),
                    language: raw.language,
                    category: raw.category.unwrap_or_else(|| "general".to_string()),
                    tags: raw.tags,
                    query: query.clone(),
                    discovered_at: now,
                    last_seen_at: now,
                };
                tx.execute(
                    &format!(
                        "INSERT INTO articles ({ARTICLE_COLUMNS}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                    ),
                    params![
                        article.fingerprint.to_string(),
                        article.title,
                        article.summary,
                        article.body,
                        article.url,
                        article.source,
                        article.author,
                        article.published_at.to_rfc3339(),
                        article.language,
                        article.category,
                        serde_json::to_string(&article.tags).unwrap_or_else(|_| "[]".into()),
                        article.query,
                        article.discovered_at.to_rfc3339(),
                        article.last_seen_at.to_rfc3339(),
                    ],
                )?;
                stored += 1;
                fingerprints.push(fp);
                articles.push(article);
            }

            tx.commit()?;
            Ok(UpsertOutcome {
                articles,
                fingerprints,
                stored,
                duplicates,
            })
        })
        .await
        .map_err(map_tr_err)
        .inspect(|outcome| {
            debug!(
                stored = outcome.stored,
                duplicates = outcome.duplicates,
                "article upsert committed"
            );
        })
}

/// Fetches articles by fingerprint, preserving request order.
pub async fn get_by_fingerprints(
    db: &Database,
    fps: &[Fingerprint],
) -> Result<Vec<Article>, TidingsError> {
    let fps: Vec<String> = fps.iter().map(|f| f.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles WHERE fingerprint = ?1"
            ))?;
            let mut articles = Vec::with_capacity(fps.len());
            for fp in &fps {
                if let Some(article) =
                    stmt.query_row(params![fp], row_to_article).optional()?
                {
                    articles.push(article);
                }
            }
            Ok(articles)
        })
        .await
        .map_err(map_tr_err)
}

/// Tag/range query over stored articles, newest first.
pub async fn query_by_tags_and_range(
    db: &Database,
    filter: ArticleFilter,
) -> Result<Vec<Article>, TidingsError> {
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE 1=1");
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(after) = filter.published_after {
                params_vec.push(Box::new(after.to_rfc3339()));
                sql.push_str(&format!(" AND published_at >= ?{}", params_vec.len()));
            }
            if let Some(before) = filter.published_before {
                params_vec.push(Box::new(before.to_rfc3339()));
                sql.push_str(&format!(" AND published_at <= ?{}", params_vec.len()));
            }
            if let Some(source) = &filter.source {
                params_vec.push(Box::new(source.clone()));
                sql.push_str(&format!(" AND source = ?{}", params_vec.len()));
            }
            sql.push_str(" ORDER BY published_at DESC");
            if filter.limit > 0 {
                sql.push_str(&format!(" LIMIT {}", filter.limit));
            }

            let mut stmt = conn.prepare(&sql)?;
            let refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(refs.as_slice(), row_to_article)?
                .collect::<Result<Vec<_>, _>>()?;

            // Tag membership is JSON-encoded; filter in process.
            let articles = if filter.tags.is_empty() {
                rows
            } else {
                rows.into_iter()
                    .filter(|a| filter.tags.iter().any(|t| a.tags.contains(t)))
                    .collect()
            };
            Ok(articles)
        })
        .await
        .map_err(map_tr_err)
}
