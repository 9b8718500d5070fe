// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only interaction log operations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;
use tidings_core::TidingsError;
use tidings_core::types::{InteractionKind, InteractionRecord};

use crate::database::{Database, map_tr_err};

/// Appends one record to the user's interaction log.
pub async fn append(db: &Database, record: InteractionRecord) -> Result<(), TidingsError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO interactions (id, user_id, at, kind, target, text, importance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.user_id,
                    record.at.to_rfc3339(),
                    record.kind.to_string(),
                    record.target,
                    record.text,
                    record.importance,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Full interaction log for a user, oldest first.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<InteractionRecord>, TidingsError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, at, kind, target, text, importance
                 FROM interactions WHERE user_id = ?1 ORDER BY at ASC, id ASC",
            )?;
            let records = stmt
                .query_map(params![user_id], |row| {
                    let at: String = row.get(2)?;
                    let kind: String = row.get(3)?;
                    Ok(InteractionRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        at: at.parse::<DateTime<Utc>>().unwrap_or_default(),
                        kind: InteractionKind::from_str(&kind)
                            .unwrap_or(InteractionKind::View),
                        target: row.get(4)?,
                        text: row.get(5)?,
                        importance: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes the user's entire log (memory clear).
pub async fn delete_for_user(db: &Database, user_id: &str) -> Result<usize, TidingsError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted =
                conn.execute("DELETE FROM interactions WHERE user_id = ?1", params![user_id])?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
