// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The document store facade over the typed query modules.
//!
//! [`DocumentStore`] is the sole fingerprint authority: callers hand it raw
//! articles and get fingerprints back; no other component computes them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tidings_config::model::StorageConfig;
use tidings_core::TidingsError;
use tidings_core::traits::{Adapter, HealthStatus};
use tidings_core::types::{
    Article, DialogueSession, Fingerprint, InteractionRecord, PipelineRun, RawArticle,
    SessionMessage, UserProfile,
};

use crate::database::{Database, map_tr_err};
use crate::queries;
pub use crate::queries::articles::{ArticleFilter, UpsertOutcome};

/// SQLite-backed document store for articles, interactions, profiles,
/// sessions, and retained pipeline runs.
#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    /// Opens the store at the configured path, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, TidingsError> {
        Ok(Self {
            db: Database::open(config).await?,
        })
    }

    /// An in-memory store for tests.
    pub async fn open_in_memory() -> Result<Self, TidingsError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    /// The shared database handle (the vector index rides the same
    /// connection).
    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Articles (C2) ---

    /// Batched idempotent upsert. See [`queries::articles::upsert_many`].
    pub async fn upsert_many(
        &self,
        raws: Vec<RawArticle>,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, TidingsError> {
        queries::articles::upsert_many(&self.db, raws, query, now).await
    }

    pub async fn get_by_fingerprints(
        &self,
        fps: &[Fingerprint],
    ) -> Result<Vec<Article>, TidingsError> {
        queries::articles::get_by_fingerprints(&self.db, fps).await
    }

    pub async fn query_by_tags_and_range(
        &self,
        filter: ArticleFilter,
    ) -> Result<Vec<Article>, TidingsError> {
        queries::articles::query_by_tags_and_range(&self.db, filter).await
    }

    // --- Interactions ---

    pub async fn append_interaction(
        &self,
        record: InteractionRecord,
    ) -> Result<(), TidingsError> {
        queries::interactions::append(&self.db, record).await
    }

    pub async fn interactions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<InteractionRecord>, TidingsError> {
        queries::interactions::list_for_user(&self.db, user_id).await
    }

    pub async fn clear_interactions(&self, user_id: &str) -> Result<usize, TidingsError> {
        queries::interactions::delete_for_user(&self.db, user_id).await
    }

    // --- Profiles ---

    pub async fn get_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<UserProfile>, TidingsError> {
        queries::profiles::get(&self.db, user_id).await
    }

    pub async fn put_profile(&self, profile: &UserProfile) -> Result<(), TidingsError> {
        queries::profiles::put(&self.db, profile).await
    }

    pub async fn delete_profile(&self, user_id: &str) -> Result<(), TidingsError> {
        queries::profiles::delete(&self.db, user_id).await
    }

    // --- Sessions ---

    pub async fn create_session(
        &self,
        session: &DialogueSession,
    ) -> Result<(), TidingsError> {
        queries::sessions::create_session(&self.db, session).await
    }

    pub async fn get_session(
        &self,
        id: &str,
    ) -> Result<Option<DialogueSession>, TidingsError> {
        queries::sessions::get_session(&self.db, id).await
    }

    pub async fn touch_session(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TidingsError> {
        queries::sessions::touch_session(&self.db, id, at).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<bool, TidingsError> {
        queries::sessions::delete_session(&self.db, id).await
    }

    pub async fn append_message(
        &self,
        message: &SessionMessage,
    ) -> Result<(), TidingsError> {
        queries::sessions::append_message(&self.db, message).await
    }

    /// Atomically appends a completed user/assistant turn and bumps the
    /// session's updated-at stamp.
    pub async fn append_turn(
        &self,
        user: &SessionMessage,
        assistant: &SessionMessage,
        touched_at: DateTime<Utc>,
    ) -> Result<(), TidingsError> {
        queries::sessions::append_turn(&self.db, user, assistant, touched_at).await
    }

    pub async fn get_messages(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionMessage>, TidingsError> {
        queries::sessions::get_messages(&self.db, session_id).await
    }

    pub async fn get_messages_newest_first(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionMessage>, TidingsError> {
        queries::sessions::get_messages_newest_first(&self.db, session_id, limit).await
    }

    pub async fn replace_messages_with_note(
        &self,
        session_id: &str,
        removed_ids: Vec<String>,
        note: &SessionMessage,
    ) -> Result<(), TidingsError> {
        queries::sessions::replace_messages_with_note(&self.db, session_id, removed_ids, note)
            .await
    }

    // --- Pipeline runs ---

    pub async fn put_run(
        &self,
        run: &PipelineRun,
        ttl_days: u32,
        now: DateTime<Utc>,
    ) -> Result<(), TidingsError> {
        queries::runs::put_run(&self.db, run, ttl_days, now).await
    }

    pub async fn get_run(
        &self,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PipelineRun>, TidingsError> {
        queries::runs::get_run(&self.db, run_id, now).await
    }

    /// Flushes pending writes and checkpoints the WAL.
    pub async fn close(&self) -> Result<(), TidingsError> {
        self.db.close().await
    }
}

#[async_trait]
impl Adapter for DocumentStore {
    fn name(&self) -> &str {
        "store"
    }

    async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}
