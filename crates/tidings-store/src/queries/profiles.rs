// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile document persistence. One JSON document per user; the
//! interaction log remains the source of truth for the derived fields.

use rusqlite::{OptionalExtension, params};
use tidings_core::TidingsError;
use tidings_core::types::UserProfile;

use crate::database::{Database, map_tr_err};

/// Loads a user's profile document, if one exists.
pub async fn get(db: &Database, user_id: &str) -> Result<Option<UserProfile>, TidingsError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM profiles WHERE user_id = ?1",
                    params![user_id],
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

/// Writes (or replaces) a user's profile document.
pub async fn put(db: &Database, profile: &UserProfile) -> Result<(), TidingsError> {
    let user_id = profile.user_id.clone();
    let updated_at = profile.updated_at.to_rfc3339();
    let doc = serde_json::to_string(profile).map_err(|e| TidingsError::StoreUnavailable {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO profiles (user_id, doc, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET doc = ?2, updated_at = ?3",
                params![user_id, doc, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a user's profile document.
pub async fn delete(db: &Database, user_id: &str) -> Result<(), TidingsError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM profiles WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
