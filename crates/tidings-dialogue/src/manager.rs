// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dialogue session manager: per-session turn serialization, context
//! assembly, generation, persistence, and memory update.
//!
//! Turn lifecycle: resolve/create session -> acquire the session lock ->
//! retrieve supporting chunks -> compose the prompt -> call the LLM ->
//! persist both turns -> record interactions -> prune history. The turn
//! is only appended once the assistant reply is accepted, so an LLM
//! failure or cancellation leaves no partial turn behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tidings_config::model::DialogueConfig;
use tidings_core::TidingsError;
use tidings_core::traits::{CompletionAdapter, TokenUsage};
use tidings_core::types::{
    DialogueSession, Fingerprint, InteractionKind, InteractionRecord, MessageRole,
    SessionMessage, UserProfile,
};
use tidings_index::IndexFilter;
use tidings_memory::UserMemoryStore;
use tidings_retrieval::{RetrievalEngine, RetrieveOptions};
use tidings_store::DocumentStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::prompt;
use crate::pruning;

/// One dialogue turn request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: String,
    /// Absent for a new session.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    /// Pipeline run seeding a NEW session's retrieval filter.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Supporting snippets to retrieve; default 5, capped at 10.
    #[serde(default = "default_max_context_news")]
    pub max_context_news: usize,
    #[serde(default = "default_true")]
    pub use_memory: bool,
    #[serde(default = "default_true")]
    pub personalize: bool,
    /// When true, a colliding turn waits for the in-flight one instead of
    /// failing `SessionBusy`.
    #[serde(default)]
    pub wait: bool,
}

fn default_max_context_news() -> usize {
    5
}
fn default_true() -> bool {
    true
}

/// Source attribution for one reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub fingerprint: Fingerprint,
    pub title: String,
    pub url: Option<String>,
    pub score: f32,
}

/// One completed dialogue turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub sources: Vec<SourceRef>,
    /// Mean retrieval similarity over the chunks behind the reply, in [0, 1].
    pub confidence: f32,
    pub usage: TokenUsage,
    pub warnings: Vec<String>,
    pub follow_up_questions: Vec<String>,
}

/// Per-session dialogue manager (C10).
pub struct DialogueManager {
    store: DocumentStore,
    retrieval: Arc<RetrievalEngine>,
    llm: Arc<dyn CompletionAdapter>,
    memory: Arc<UserMemoryStore>,
    config: DialogueConfig,
    /// Per-session turn locks: turns never interleave.
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Session-scoped query embedding cache.
    query_cache: DashMap<String, HashMap<String, Vec<f32>>>,
}

impl DialogueManager {
    pub fn new(
        store: DocumentStore,
        retrieval: Arc<RetrievalEngine>,
        llm: Arc<dyn CompletionAdapter>,
        memory: Arc<UserMemoryStore>,
        config: DialogueConfig,
    ) -> Self {
        Self {
            store,
            retrieval,
            llm,
            memory,
            config,
            locks: DashMap::new(),
            query_cache: DashMap::new(),
        }
    }

    /// Processes one dialogue turn end to end.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, TidingsError> {
        if request.message.trim().is_empty() {
            return Err(TidingsError::Config("message must not be empty".into()));
        }
        let request = ChatRequest {
            max_context_news: request.max_context_news.clamp(1, 10),
            ..request
        };

        let session = self.resolve_session(&request).await?;

        // Serialize turns per session.
        let lock = self
            .locks
            .entry(session.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = if request.wait {
            lock.lock().await
        } else {
            lock.try_lock().map_err(|_| TidingsError::SessionBusy {
                session_id: session.id.clone(),
            })?
        };

        let deadline = Duration::from_secs(self.config.turn_deadline_secs.max(1));
        match tokio::time::timeout(deadline, self.take_turn(&request, &session)).await {
            Ok(result) => result,
            Err(_) => Err(TidingsError::DeadlineExceeded {
                seconds: self.config.turn_deadline_secs,
            }),
        }
    }

    /// Session messages, newest first, for the HTTP surface.
    pub async fn session_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionMessage>, TidingsError> {
        if self.store.get_session(session_id).await?.is_none() {
            return Err(TidingsError::NotFound {
                entity: "session",
                id: session_id.to_string(),
            });
        }
        self.store
            .get_messages_newest_first(session_id, limit)
            .await
    }

    /// Deletes a session and its state.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), TidingsError> {
        let existed = self.store.delete_session(session_id).await?;
        self.locks.remove(session_id);
        self.query_cache.remove(session_id);
        if !existed {
            return Err(TidingsError::NotFound {
                entity: "session",
                id: session_id.to_string(),
            });
        }
        info!(session = session_id, "session deleted");
        Ok(())
    }

    async fn resolve_session(
        &self,
        request: &ChatRequest,
    ) -> Result<DialogueSession, TidingsError> {
        if let Some(id) = &request.session_id {
            return self
                .store
                .get_session(id)
                .await?
                .ok_or_else(|| TidingsError::NotFound {
                    entity: "session",
                    id: id.clone(),
                });
        }
        let now = Utc::now();
        let session = DialogueSession {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            run_id: request.run_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_session(&session).await?;
        debug!(session = %session.id, user = %session.user_id, "session created");
        Ok(session)
    }

    async fn take_turn(
        &self,
        request: &ChatRequest,
        session: &DialogueSession,
    ) -> Result<ChatResponse, TidingsError> {
        let turn_started = Utc::now();
        let mut warnings = Vec::new();

        let profile = if request.use_memory && !request.user_id.is_empty() {
            self.memory.get_profile(&request.user_id).await.ok()
        } else {
            None
        };

        // Retrieval failure degrades to a history-only reply.
        let (chunks, low_recall) = match self.retrieve(request, session, &profile).await {
            Ok(result) => (result.chunks, result.low_recall),
            Err(e) => {
                warn!(session = %session.id, error = %e, "retrieval failed, continuing without context");
                warnings.push("retrieval unavailable; answering from history".into());
                (Vec::new(), true)
            }
        };
        if low_recall {
            warnings.push(tidings_retrieval::LOW_RECALL.to_string());
        }

        let history = self.store.get_messages(&session.id).await?;
        let personalize_profile = if request.personalize {
            profile.as_ref()
        } else {
            None
        };
        let completion_request = prompt::compose(
            &self.config,
            personalize_profile,
            &chunks,
            &history,
            &request.message,
        );

        // An LLM failure propagates without recording a partial turn.
        let completion = self.llm.complete(completion_request).await?;

        let user_message = SessionMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            role: MessageRole::User,
            content: request.message.clone(),
            created_at: turn_started,
        };
        let assistant_message = SessionMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            role: MessageRole::Assistant,
            content: completion.text.clone(),
            created_at: Utc::now(),
        };
        // The turn lands as one atomic unit only after the reply is
        // accepted; a deadline firing mid-persist cannot strand the user
        // message without its paired reply.
        self.store
            .append_turn(&user_message, &assistant_message, Utc::now())
            .await?;

        // Confidence: mean similarity over the supporting chunks.
        let confidence = if chunks.is_empty() {
            0.0
        } else {
            (chunks.iter().map(|c| c.similarity).sum::<f32>() / chunks.len() as f32)
                .clamp(0.0, 1.0)
        };

        let sources: Vec<SourceRef> = chunks
            .iter()
            .map(|c| SourceRef {
                fingerprint: c.article,
                title: c.title.clone(),
                url: c.url.clone(),
                score: c.score,
            })
            .collect();

        self.record_turn_interactions(request, session, &sources, &mut warnings)
            .await;

        if let Err(e) = pruning::maybe_prune(
            &self.store,
            self.llm.as_ref(),
            &session.id,
            self.config.history_cap,
        )
        .await
        {
            warn!(session = %session.id, error = %e, "history pruning failed");
            warnings.push("history pruning failed".into());
        }

        info!(
            session = %session.id,
            sources = sources.len(),
            confidence,
            "dialogue turn completed"
        );
        Ok(ChatResponse {
            session_id: session.id.clone(),
            reply: completion.text,
            follow_up_questions: prompt::follow_up_questions(&chunks),
            sources,
            confidence,
            usage: completion.usage,
            warnings,
        })
    }

    async fn retrieve(
        &self,
        request: &ChatRequest,
        session: &DialogueSession,
        profile: &Option<UserProfile>,
    ) -> Result<tidings_retrieval::RetrievalResult, TidingsError> {
        let filter = match &session.run_id {
            Some(run_id) => match self.store.get_run(run_id, Utc::now()).await? {
                Some(run) => IndexFilter::for_articles(
                    run.articles.iter().map(|a| a.fingerprint).collect(),
                ),
                None => IndexFilter {
                    articles: None,
                    published_after: Some(Utc::now() - chrono::Duration::days(7)),
                },
            },
            None => IndexFilter {
                articles: None,
                published_after: Some(Utc::now() - chrono::Duration::days(7)),
            },
        };

        let cached_vector = self
            .query_cache
            .get(&session.id)
            .and_then(|m| m.get(&request.message).cloned());

        let result = self
            .retrieval
            .retrieve(
                &request.message,
                RetrieveOptions {
                    k: request.max_context_news,
                    filter,
                    floor: None,
                    profile: if request.personalize {
                        profile.clone()
                    } else {
                        None
                    },
                    query_vector: cached_vector,
                },
            )
            .await?;

        self.query_cache
            .entry(session.id.clone())
            .or_default()
            .insert(request.message.clone(), result.query_vector.clone());
        Ok(result)
    }

    /// Records the turn against user memory: the message itself plus the
    /// articles it cited. Failures downgrade to warnings.
    async fn record_turn_interactions(
        &self,
        request: &ChatRequest,
        session: &DialogueSession,
        sources: &[SourceRef],
        warnings: &mut Vec<String>,
    ) {
        if !request.use_memory || request.user_id.is_empty() {
            return;
        }
        let mut records = vec![InteractionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            at: Utc::now(),
            kind: InteractionKind::DialogueTurn,
            target: Some(session.id.clone()),
            text: Some(request.message.clone()),
            importance: 0.6,
        }];
        for source in sources {
            records.push(InteractionRecord {
                id: Uuid::new_v4().to_string(),
                user_id: request.user_id.clone(),
                at: Utc::now(),
                kind: InteractionKind::DialogueTurn,
                target: Some(source.fingerprint.to_string()),
                text: None,
                importance: 0.3,
            });
        }
        for record in records {
            if let Err(e) = self.memory.record(record).await {
                warn!(error = %e, "interaction recording failed");
                warnings.push("memory update failed for this turn".into());
                break;
            }
        }
    }
}
