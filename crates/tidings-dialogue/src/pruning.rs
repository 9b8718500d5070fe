// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History pruning: when a session's stored turns exceed the hard cap,
//! the oldest half is replaced by a single synthetic system note that
//! summarizes the replaced turns.

use tidings_core::TidingsError;
use tidings_core::traits::{ChatMessage, CompletionAdapter, CompletionRequest};
use tidings_core::types::{MessageRole, SessionMessage};
use tidings_store::DocumentStore;
use tracing::info;
use uuid::Uuid;

/// System prompt for the pruning summarization call.
const PRUNE_PROMPT: &str = "You are a conversation summarizer. Summarize the \
conversation below into a compact third-person note, at most 300 tokens. \
Preserve: the user's questions and stated interests, the news topics and \
sources discussed, and any conclusions reached. Omit greetings and \
repetition. Start with 'Conversation summary:' on the first line.";

/// Prunes the session's history if the stored turn count exceeds `cap`.
///
/// Returns true when a pruning pass ran. The synthetic note inherits the
/// timestamp of the oldest replaced message, so it sorts ahead of the
/// preserved tail.
pub async fn maybe_prune(
    store: &DocumentStore,
    llm: &dyn CompletionAdapter,
    session_id: &str,
    cap: usize,
) -> Result<bool, TidingsError> {
    let messages = store.get_messages(session_id).await?;
    if messages.len() <= cap {
        return Ok(false);
    }

    let half = messages.len() / 2;
    let (oldest, _tail) = messages.split_at(half);

    let conversation_text: String = oldest
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let request = CompletionRequest {
        system: Some(PRUNE_PROMPT.to_string()),
        messages: vec![ChatMessage::user(format!(
            "Summarize this conversation:\n\n{conversation_text}"
        ))],
        temperature: Some(0.2),
        max_tokens: Some(300),
    };
    let summary = llm.complete(request).await?.text;

    let note = SessionMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        role: MessageRole::System,
        content: summary,
        created_at: oldest[0].created_at,
    };
    let removed_ids: Vec<String> = oldest.iter().map(|m| m.id.clone()).collect();
    let removed = removed_ids.len();
    store
        .replace_messages_with_note(session_id, removed_ids, &note)
        .await?;

    info!(session = session_id, removed, "history pruned into summary note");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tidings_core::traits::{Adapter, CompletionResponse, HealthStatus, TokenUsage};
    use tidings_core::types::DialogueSession;

    struct SummaryLlm;

    #[async_trait]
    impl Adapter for SummaryLlm {
        fn name(&self) -> &str {
            "summary-llm"
        }
        async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl CompletionAdapter for SummaryLlm {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, TidingsError> {
            Ok(CompletionResponse {
                text: "Conversation summary: earlier discussion condensed.".into(),
                usage: TokenUsage::default(),
            })
        }

        async fn complete_structured(
            &self,
            _request: CompletionRequest,
            _schema: &tidings_core::traits::OutputSchema,
        ) -> Result<(serde_json::Value, TokenUsage), TidingsError> {
            unreachable!("pruning never requests structured output")
        }
    }

    async fn seeded_session(turns: usize) -> (DocumentStore, String) {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let session = DialogueSession {
            id: "s1".into(),
            user_id: "u1".into(),
            run_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.create_session(&session).await.unwrap();

        let base = Utc::now() - Duration::hours(1);
        for i in 0..turns {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            store
                .append_message(&SessionMessage {
                    id: format!("m{i:03}"),
                    session_id: "s1".into(),
                    role,
                    content: format!("turn {i}"),
                    created_at: base + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }
        (store, "s1".to_string())
    }

    #[tokio::test]
    async fn under_cap_is_untouched() {
        let (store, session) = seeded_session(10).await;
        let pruned = maybe_prune(&store, &SummaryLlm, &session, 30).await.unwrap();
        assert!(!pruned);
        assert_eq!(store.get_messages(&session).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn over_cap_replaces_oldest_half_with_one_note() {
        let (store, session) = seeded_session(32).await;
        let pruned = maybe_prune(&store, &SummaryLlm, &session, 30).await.unwrap();
        assert!(pruned);

        let messages = store.get_messages(&session).await.unwrap();
        // 32 -> 16 removed, 1 note + 16 preserved.
        assert_eq!(messages.len(), 17);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.starts_with("Conversation summary:"));
        // Preserved tail stays verbatim and in order.
        assert_eq!(messages[1].content, "turn 16");
        assert_eq!(messages[16].content, "turn 31");

        // The next pass sees 17 <= 30 and does nothing: exactly one
        // summarization per cap crossing.
        let again = maybe_prune(&store, &SummaryLlm, &session, 30).await.unwrap();
        assert!(!again);
    }
}
