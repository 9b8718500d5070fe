// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialogue session and message persistence.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tidings_core::TidingsError;
use tidings_core::types::{DialogueSession, MessageRole, SessionMessage};

use crate::database::{Database, map_tr_err};

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<DialogueSession> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(DialogueSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        run_id: row.get(2)?,
        created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_default(),
        updated_at: updated_at.parse::<DateTime<Utc>>().unwrap_or_default(),
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<SessionMessage> {
    let role: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    Ok(SessionMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: MessageRole::from_str(&role).unwrap_or(MessageRole::System),
        content: row.get(3)?,
        created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_default(),
    })
}

/// Creates a new session row.
pub async fn create_session(
    db: &Database,
    session: &DialogueSession,
) -> Result<(), TidingsError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, run_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session.id,
                    session.user_id,
                    session.run_id,
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetches a session by id.
pub async fn get_session(
    db: &Database,
    id: &str,
) -> Result<Option<DialogueSession>, TidingsError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let session = conn
                .query_row(
                    "SELECT id, user_id, run_id, created_at, updated_at
                     FROM sessions WHERE id = ?1",
                    params![id],
                    row_to_session,
                )
                .optional()?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Bumps a session's updated-at stamp.
pub async fn touch_session(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
) -> Result<(), TidingsError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
                params![id, at.to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a session and (via cascade) its messages. Returns whether a
/// session row existed.
pub async fn delete_session(db: &Database, id: &str) -> Result<bool, TidingsError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Appends one message to a session.
pub async fn append_message(
    db: &Database,
    message: &SessionMessage,
) -> Result<(), TidingsError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id,
                    message.session_id,
                    message.role.to_string(),
                    message.content,
                    message.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a session in chronological order.
pub async fn get_messages(
    db: &Database,
    session_id: &str,
) -> Result<Vec<SessionMessage>, TidingsError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, created_at
                 FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
            )?;
            let messages = stmt
                .query_map(params![session_id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` messages of a session, newest first.
pub async fn get_messages_newest_first(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<SessionMessage>, TidingsError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, created_at
                 FROM messages WHERE session_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )?;
            let messages = stmt
                .query_map(params![session_id, limit as i64], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically appends one completed turn: the user message, the accepted
/// assistant reply, and the session's updated-at bump commit together.
///
/// A turn never lands half-written: cancellation between the two message
/// writes cannot strand a user message without its paired reply.
pub async fn append_turn(
    db: &Database,
    user: &SessionMessage,
    assistant: &SessionMessage,
    touched_at: DateTime<Utc>,
) -> Result<(), TidingsError> {
    let user = user.clone();
    let assistant = assistant.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for message in [&user, &assistant] {
                tx.execute(
                    "INSERT INTO messages (id, session_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        message.id,
                        message.session_id,
                        message.role.to_string(),
                        message.content,
                        message.created_at.to_rfc3339(),
                    ],
                )?;
            }
            tx.execute(
                "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
                params![user.session_id, touched_at.to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically replaces a set of pruned messages with one synthetic system
/// note carrying their summary.
pub async fn replace_messages_with_note(
    db: &Database,
    session_id: &str,
    removed_ids: Vec<String>,
    note: &SessionMessage,
) -> Result<(), TidingsError> {
    let session_id = session_id.to_string();
    let note = note.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for id in &removed_ids {
                tx.execute(
                    "DELETE FROM messages WHERE session_id = ?1 AND id = ?2",
                    params![session_id, id],
                )?;
            }
            tx.execute(
                "INSERT INTO messages (id, session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    note.id,
                    note.session_id,
                    note.role.to_string(),
                    note.content,
                    note.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
