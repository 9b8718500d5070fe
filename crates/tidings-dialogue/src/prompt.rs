// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt composition for dialogue turns.
//!
//! The prompt is assembled from four parts: the system preamble, an
//! optional personalization block, the numbered context block, and the
//! rolling conversation history. History is budgeted in tokens so the
//! whole prompt stays within 60% of the model context window.

use tidings_config::model::DialogueConfig;
use tidings_core::traits::{ChatMessage, CompletionRequest};
use tidings_core::types::{MessageRole, RetrievedChunk, SessionMessage, UserProfile};
use tidings_index::chunker::estimate_tokens;
use tidings_memory::top_categories;

/// Fraction of the model window the composed prompt may occupy.
const WINDOW_FRACTION: f64 = 0.6;

/// Role, formatting, and citation rules for the assistant.
const SYSTEM_PREAMBLE: &str = "You are a news assistant answering questions about \
recently processed articles. Format replies as structured Markdown: use headings \
for distinct aspects, bullet lists for enumerations, and bold for key figures. \
Ground every claim in the numbered sources provided; cite them inline by index \
like [1] or [2]. If the sources do not support a claim, say so plainly instead \
of speculating. When no sources are available, answer only from the conversation \
itself and say that no fresh articles back the answer.";

/// Renders the personalization block from the user's profile, weighted by
/// their personalization level. Empty at level zero.
pub fn personalization_block(profile: &UserProfile) -> Option<String> {
    let level = profile.style.personalization_level;
    if level <= 0.0 {
        return None;
    }
    let mut lines = Vec::new();

    let top = top_categories(profile, 3);
    if !top.is_empty() {
        let names: Vec<String> = top.into_iter().map(|(c, _)| c).collect();
        lines.push(format!(
            "The reader follows these topics closely: {}.",
            names.join(", ")
        ));
    }
    lines.push(format!(
        "Preferred response length: {}. Tone: {}. Depth: {}.",
        profile.style.response_length, profile.style.formality, profile.style.detail_depth
    ));
    let strength = if level >= 0.75 {
        "Lean strongly into these preferences."
    } else if level >= 0.35 {
        "Lean moderately into these preferences."
    } else {
        "Treat these preferences as mild hints."
    };
    lines.push(strength.to_string());

    Some(format!("Reader profile:\n{}", lines.join("\n")))
}

/// Renders the numbered source excerpts.
pub fn context_block(chunks: &[RetrievedChunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }
    let entries: Vec<String> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "[{}] {} ({}, {}){}\n{}",
                i + 1,
                c.title,
                c.source,
                c.published_at.format("%Y-%m-%d"),
                c.url
                    .as_deref()
                    .map(|u| format!(" — {u}"))
                    .unwrap_or_default(),
                c.text
            )
        })
        .collect();
    Some(format!("News sources:\n\n{}", entries.join("\n\n")))
}

/// Composes the full completion request for one turn.
///
/// History is included newest-first up to the remaining token budget, then
/// restored to chronological order. Synthetic system notes (pruning
/// summaries) are folded into the system text rather than the turn list.
pub fn compose(
    config: &DialogueConfig,
    profile: Option<&UserProfile>,
    chunks: &[RetrievedChunk],
    history: &[SessionMessage],
    user_message: &str,
) -> CompletionRequest {
    let mut system_parts = vec![SYSTEM_PREAMBLE.to_string()];
    if let Some(profile) = profile
        && let Some(block) = personalization_block(profile)
    {
        system_parts.push(block);
    }
    if let Some(block) = context_block(chunks) {
        system_parts.push(block);
    }
    for note in history
        .iter()
        .filter(|m| m.role == MessageRole::System)
    {
        system_parts.push(note.content.clone());
    }
    let system = system_parts.join("\n\n");

    // Token budget for the turn history.
    let window_budget = (config.context_window_tokens as f64 * WINDOW_FRACTION) as u32;
    let fixed = estimate_tokens(&system) + estimate_tokens(user_message);
    let mut remaining = window_budget.saturating_sub(fixed);

    let mut turns: Vec<ChatMessage> = Vec::new();
    for message in history
        .iter()
        .rev()
        .filter(|m| m.role != MessageRole::System)
    {
        let cost = estimate_tokens(&message.content);
        if cost > remaining {
            break;
        }
        remaining -= cost;
        turns.push(match message.role {
            MessageRole::User => ChatMessage::user(message.content.clone()),
            _ => ChatMessage::assistant(message.content.clone()),
        });
    }
    turns.reverse();
    turns.push(ChatMessage::user(user_message.to_string()));

    CompletionRequest {
        system: Some(system),
        messages: turns,
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
    }
}

/// Mechanical follow-up suggestions derived from the context titles.
pub fn follow_up_questions(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    chunks
        .iter()
        .filter(|c| !c.title.is_empty() && seen.insert(c.title.clone()))
        .take(3)
        .map(|c| format!("What are the latest developments on \"{}\"?", c.title))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidings_core::types::Fingerprint;

    fn chunk(title: &str, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            article: Fingerprint(uuid::Uuid::new_v4()),
            ordinal: 0,
            text: text.to_string(),
            title: title.to_string(),
            url: Some("https://e.com/a".into()),
            source: "Wire".into(),
            published_at: Utc::now(),
            score: 0.8,
            similarity: 0.8,
        }
    }

    fn message(role: MessageRole, content: &str, at: &str) -> SessionMessage {
        SessionMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: "s".into(),
            role,
            content: content.to_string(),
            created_at: at.parse().unwrap(),
        }
    }

    #[test]
    fn context_block_numbers_sources_from_one() {
        let block =
            context_block(&[chunk("First story", "body a"), chunk("Second", "body b")])
                .unwrap();
        assert!(block.contains("[1] First story"));
        assert!(block.contains("[2] Second"));
        assert!(block.contains("https://e.com/a"));
        assert!(context_block(&[]).is_none());
    }

    #[test]
    fn personalization_scales_with_level() {
        let mut profile = UserProfile::new("u", Utc::now());
        profile.category_weights.insert("technology".into(), 0.9);
        profile.style.personalization_level = 0.9;
        let strong = personalization_block(&profile).unwrap();
        assert!(strong.contains("technology"));
        assert!(strong.contains("strongly"));

        profile.style.personalization_level = 0.0;
        assert!(personalization_block(&profile).is_none());
    }

    #[test]
    fn compose_orders_history_chronologically_and_ends_with_user_message() {
        let config = DialogueConfig::default();
        let history = vec![
            message(MessageRole::User, "first question", "2026-07-30T08:00:00Z"),
            message(MessageRole::Assistant, "first answer", "2026-07-30T08:00:05Z"),
        ];
        let request = compose(&config, None, &[], &history, "second question");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].content, "first question");
        assert_eq!(request.messages[1].content, "first answer");
        assert_eq!(request.messages[2].content, "second question");
    }

    #[test]
    fn compose_folds_system_notes_into_the_system_prompt() {
        let config = DialogueConfig::default();
        let history = vec![
            message(
                MessageRole::System,
                "Conversation summary: they discussed qubits.",
                "2026-07-30T08:00:00Z",
            ),
            message(MessageRole::User, "and now?", "2026-07-30T08:01:00Z"),
        ];
        let request = compose(&config, None, &[], &history, "next");
        assert!(
            request
                .system
                .as_deref()
                .unwrap()
                .contains("Conversation summary")
        );
        // The note does not appear as a turn.
        assert_eq!(request.messages.len(), 2);
    }

    #[test]
    fn compose_drops_oldest_turns_beyond_the_token_budget() {
        let config = DialogueConfig {
            context_window_tokens: 1_000, // budget = 600 tokens
            ..DialogueConfig::default()
        };
        let long = "x".repeat(2_400); // ~600 tokens per turn, beyond the whole budget
        let history = vec![
            message(MessageRole::User, &long, "2026-07-30T08:00:00Z"),
            message(MessageRole::Assistant, &long, "2026-07-30T08:00:05Z"),
            message(MessageRole::User, "recent short question", "2026-07-30T08:01:00Z"),
            message(MessageRole::Assistant, "recent short answer", "2026-07-30T08:01:05Z"),
        ];
        let request = compose(&config, None, &[], &history, "now");
        let contents: Vec<&str> = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert!(contents.contains(&"recent short question"));
        assert!(contents.contains(&"now"));
        assert!(
            !contents.iter().any(|c| c.len() > 1_000),
            "over-budget old turns must be dropped"
        );
    }

    #[test]
    fn follow_ups_are_capped_and_deduped() {
        let chunks = vec![
            chunk("Alpha", "a"),
            chunk("Alpha", "a again"),
            chunk("Beta", "b"),
            chunk("Gamma", "c"),
            chunk("Delta", "d"),
        ];
        let ups = follow_up_questions(&chunks);
        assert_eq!(ups.len(), 3);
        assert!(ups[0].contains("Alpha"));
        assert!(ups[1].contains("Beta"));
    }
}
