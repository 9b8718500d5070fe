// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline run retention with TTL eviction.
//!
//! Runs are stored as JSON documents and evicted opportunistically: every
//! write sweeps rows whose `expires_at` has passed.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, params};
use tidings_core::TidingsError;
use tidings_core::types::PipelineRun;
use tracing::debug;

use crate::database::{Database, map_tr_err};

/// Persists a finished run and sweeps expired ones.
pub async fn put_run(
    db: &Database,
    run: &PipelineRun,
    ttl_days: u32,
    now: DateTime<Utc>,
) -> Result<(), TidingsError> {
    let doc = serde_json::to_string(run).map_err(|e| TidingsError::StoreUnavailable {
        source: Box::new(e),
    })?;
    let run_id = run.run_id.clone();
    let user_id = run.user_id.clone();
    let expires_at = (now + Duration::days(i64::from(ttl_days))).to_rfc3339();
    let now_s = now.to_rfc3339();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let swept = tx.execute(
                "DELETE FROM pipeline_runs WHERE expires_at < ?1",
                params![now_s],
            )?;
            tx.execute(
                "INSERT INTO pipeline_runs (run_id, user_id, doc, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(run_id) DO UPDATE SET doc = ?3, expires_at = ?5",
                params![run_id, user_id, doc, now_s, expires_at],
            )?;
            tx.commit()?;
            Ok(swept)
        })
        .await
        .map_err(map_tr_err)
        .inspect(|swept| {
            if *swept > 0 {
                debug!(swept, "evicted expired pipeline runs");
            }
        })?;
    Ok(())
}

/// Fetches a retained run by id; expired rows are treated as absent.
pub async fn get_run(
    db: &Database,
    run_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<PipelineRun>, TidingsError> {
    let run_id = run_id.to_string();
    let now_s = now.to_rfc3339();
    db.connection()
        .call(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM pipeline_runs WHERE run_id = ?1 AND expires_at >= ?2",
                    params![run_id, now_s],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(doc)
        })
        .await
        .map_err(map_tr_err)?
        .map(|doc| {
            serde_json::from_str(&doc).map_err(|e| TidingsError::StoreUnavailable {
                source: Box::new(e),
            })
        })
        .transpose()
}
