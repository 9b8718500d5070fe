// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Card synthesis: select the top articles by importance and extract a
//! structured card for each via the LLM.
//!
//! This module is the sole owner of the card prompt and its schema.
//! Selection and ordering are deterministic for fixed inputs; only the
//! LLM-generated text varies.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tidings_core::TidingsError;
use tidings_core::traits::{
    ChatMessage, CompletionAdapter, CompletionRequest, FieldSpec, OutputSchema,
};
use tidings_core::types::{Article, Fingerprint, NewsCard, Sentiment, UserProfile};
use tracing::{debug, warn};

use crate::credibility::source_credibility;
use crate::importance::importance;

/// System prompt for the per-card extraction call.
const CARD_PROMPT: &str = "You are a news editor producing structured card copy. \
Given one article, respond with ONLY a JSON object with these fields: \
\"headline\" (a tightened headline, max 12 words), \
\"summary\" (2-4 sentences covering the who/what/why), \
\"keyPoints\" (3-6 short bullet strings), \
\"topicTags\" (1-5 lowercase topic tags). \
Stay strictly factual to the provided text; do not invent details.";

/// Warning tag surfaced when more than half the selected articles fail.
pub const CARD_GENERATION_DEGRADED: &str = "CardGenerationDegraded";

fn card_schema() -> OutputSchema {
    OutputSchema {
        fields: vec![
            ("headline".to_string(), FieldSpec::Text),
            ("summary".to_string(), FieldSpec::Text),
            ("keyPoints".to_string(), FieldSpec::TextArray { min: 3, max: 6 }),
            ("topicTags".to_string(), FieldSpec::TextArray { min: 1, max: 5 }),
        ],
    }
}

/// Result of one synthesis pass.
#[derive(Debug, Default)]
pub struct SynthesisResult {
    /// Cards ordered by descending display priority.
    pub cards: Vec<NewsCard>,
    pub warnings: Vec<String>,
}

/// Ranks articles and synthesizes structured news cards.
pub struct CardSynthesizer {
    llm: Arc<dyn CompletionAdapter>,
}

impl CardSynthesizer {
    pub fn new(llm: Arc<dyn CompletionAdapter>) -> Self {
        Self { llm }
    }

    /// Selects the `max_cards` most important articles and produces one
    /// card per article. Individual failures are filtered out; losing more
    /// than half the selection degrades to a warning rather than an error.
    pub async fn synthesize(
        &self,
        articles: &[Article],
        sentiments: &HashMap<Fingerprint, Sentiment>,
        max_cards: usize,
        profile: Option<&UserProfile>,
        now: DateTime<Utc>,
    ) -> SynthesisResult {
        let selected = select_articles(articles, sentiments, max_cards, profile, now);
        if selected.is_empty() {
            return SynthesisResult::default();
        }
        let total = selected.len();

        let generations = join_all(selected.iter().map(|(article, score)| {
            let sentiment = sentiments
                .get(&article.fingerprint)
                .copied()
                .unwrap_or_else(Sentiment::neutral);
            self.generate_card(article, sentiment, *score, now)
        }))
        .await;

        let mut cards: Vec<NewsCard> = Vec::with_capacity(total);
        let mut failures = 0usize;
        for (generated, (article, _)) in generations.into_iter().zip(&selected) {
            match generated {
                Ok(card) => cards.push(card),
                Err(e) => {
                    warn!(article = %article.fingerprint, error = %e, "card generation failed");
                    failures += 1;
                }
            }
        }

        // Display priority follows selection rank; rank 1 maps to 10.
        for (i, card) in cards.iter_mut().enumerate() {
            let rank_normalized = (total - i) as f32 / total as f32;
            card.priority = (1.0 + (9.0 * rank_normalized).floor()) as u8;
        }

        let mut warnings = Vec::new();
        if failures * 2 > total {
            warnings.push(format!(
                "{CARD_GENERATION_DEGRADED}: {failures} of {total} cards failed"
            ));
        }
        debug!(produced = cards.len(), failures, "card synthesis finished");
        SynthesisResult { cards, warnings }
    }

    async fn generate_card(
        &self,
        article: &Article,
        sentiment: Sentiment,
        importance_score: f32,
        now: DateTime<Utc>,
    ) -> Result<NewsCard, TidingsError> {
        let body_excerpt = article
            .body
            .as_deref()
            .map(|b| b.chars().take(4_000).collect::<String>())
            .unwrap_or_default();
        let user_message = format!(
            "Title: {}\nSource: {}\nPublished: {}\nSummary: {}\n{}",
            article.title,
            article.source,
            article.published_at.to_rfc3339(),
            article.summary,
            if body_excerpt.is_empty() {
                String::new()
            } else {
                format!("Body:\n{body_excerpt}")
            }
        );

        let request = CompletionRequest {
            system: Some(CARD_PROMPT.to_string()),
            messages: vec![ChatMessage::user(user_message)],
            temperature: Some(0.3),
            max_tokens: Some(800),
        };

        let (value, _usage) = self
            .llm
            .complete_structured(request, &card_schema())
            .await?;

        let as_strings = |key: &str| -> Vec<String> {
            value[key]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(NewsCard {
            article: article.fingerprint,
            headline: value["headline"].as_str().unwrap_or(&article.title).to_string(),
            summary: value["summary"].as_str().unwrap_or_default().to_string(),
            key_points: as_strings("keyPoints"),
            sentiment,
            topic_tags: as_strings("topicTags"),
            source_credibility: source_credibility(&article.source),
            importance: importance_score,
            priority: 1, // assigned after ordering
            generated_at: now,
        })
    }
}

/// Deterministic top-N selection: importance descending, ties broken by
/// published-at descending then fingerprint ascending.
fn select_articles<'a>(
    articles: &'a [Article],
    sentiments: &HashMap<Fingerprint, Sentiment>,
    max_cards: usize,
    profile: Option<&UserProfile>,
    now: DateTime<Utc>,
) -> Vec<(&'a Article, f32)> {
    let mut scored: Vec<(&Article, f32)> = articles
        .iter()
        .map(|a| {
            let sentiment = sentiments
                .get(&a.fingerprint)
                .copied()
                .unwrap_or_else(Sentiment::neutral);
            (a, importance(a, &sentiment, profile, now))
        })
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.published_at.cmp(&a.published_at))
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    scored.truncate(max_cards);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tidings_core::traits::{Adapter, CompletionResponse, HealthStatus, TokenUsage};
    use tidings_core::types::SentimentLabel;
    use uuid::Uuid;

    /// Mock LLM: returns a valid card object, optionally failing the first
    /// `fail_first` structured calls.
    struct MockLlm {
        fail_first: usize,
        calls: AtomicUsize,
    }

    impl MockLlm {
        fn reliable() -> Self {
            Self {
                fail_first: 0,
                calls: AtomicUsize::new(0),
            }
        }
        fn failing_first(n: usize) -> Self {
            Self {
                fail_first: n,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Adapter for MockLlm {
        fn name(&self) -> &str {
            "mock-llm"
        }
        async fn health_check(&self) -> Result<HealthStatus, TidingsError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl CompletionAdapter for MockLlm {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, TidingsError> {
            Ok(CompletionResponse {
                text: "mock".into(),
                usage: TokenUsage::default(),
            })
        }

        async fn complete_structured(
            &self,
            _request: CompletionRequest,
            _schema: &OutputSchema,
        ) -> Result<(serde_json::Value, TokenUsage), TidingsError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(TidingsError::ProviderUnavailable {
                    provider: "anthropic".into(),
                    message: "mock outage".into(),
                    source: None,
                });
            }
            Ok((
                serde_json::json!({
                    "headline": "Card headline",
                    "summary": "One sentence. Another sentence.",
                    "keyPoints": ["first", "second", "third"],
                    "topicTags": ["technology"]
                }),
                TokenUsage::default(),
            ))
        }
    }

    fn article(title: &str, published_at: &str, fp: u128) -> Article {
        Article {
            fingerprint: Fingerprint(Uuid::from_u128(fp)),
            title: title.into(),
            summary: "Summary".into(),
            body: None,
            url: Some(format!("https://e.com/{title}")),
            source: "Reuters".into(),
            author: None,
            published_at: published_at.parse().unwrap(),
            language: None,
            category: "technology".into(),
            tags: Vec::new(),
            query: String::new(),
            discovered_at: Utc::now(),
            last_seen_at: Utc::now(),
        }
    }

    fn sentiments(articles: &[Article], magnitude: f32) -> HashMap<Fingerprint, Sentiment> {
        articles
            .iter()
            .map(|a| {
                (
                    a.fingerprint,
                    Sentiment {
                        label: SentimentLabel::Positive,
                        magnitude,
                        confidence: 1.0,
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn produces_at_most_max_cards_with_rank_priorities() {
        let synthesizer = CardSynthesizer::new(Arc::new(MockLlm::reliable()));
        let articles: Vec<Article> = (0..6)
            .map(|i| article(&format!("a{i}"), "2026-07-30T10:00:00Z", i as u128 + 1))
            .collect();
        let s = sentiments(&articles, 0.5);

        let now = "2026-07-30T12:00:00Z".parse().unwrap();
        let result = synthesizer.synthesize(&articles, &s, 3, None, now).await;
        assert_eq!(result.cards.len(), 3);
        assert_eq!(result.cards[0].priority, 10);
        assert!(result.cards[0].priority >= result.cards[1].priority);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn max_cards_beyond_available_returns_available() {
        let synthesizer = CardSynthesizer::new(Arc::new(MockLlm::reliable()));
        let articles = vec![article("only", "2026-07-30T10:00:00Z", 1)];
        let s = sentiments(&articles, 0.2);
        let now = "2026-07-30T12:00:00Z".parse().unwrap();
        let result = synthesizer.synthesize(&articles, &s, 10, None, now).await;
        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.cards[0].priority, 10);
    }

    #[tokio::test]
    async fn selection_ties_break_on_published_at_then_fingerprint() {
        let synthesizer = CardSynthesizer::new(Arc::new(MockLlm::reliable()));
        // Identical importance inputs except published-at / fingerprint.
        let articles = vec![
            article("older", "2026-07-30T08:00:00Z", 9),
            article("newer-high-fp", "2026-07-30T10:00:00Z", 7),
            article("newer-low-fp", "2026-07-30T10:00:00Z", 3),
        ];
        let s = sentiments(&articles, 0.5);
        let now = "2026-07-30T12:00:00Z".parse().unwrap();

        let result = synthesizer.synthesize(&articles, &s, 2, None, now).await;
        let picked: Vec<Fingerprint> = result.cards.iter().map(|c| c.article).collect();
        // Newest first; equal published-at resolves by ascending fingerprint.
        assert_eq!(picked[0], Fingerprint(Uuid::from_u128(3)));
        assert_eq!(picked[1], Fingerprint(Uuid::from_u128(7)));
    }

    #[tokio::test]
    async fn majority_failures_degrade_with_warning() {
        let synthesizer = CardSynthesizer::new(Arc::new(MockLlm::failing_first(2)));
        let articles: Vec<Article> = (0..3)
            .map(|i| article(&format!("a{i}"), "2026-07-30T10:00:00Z", i as u128 + 1))
            .collect();
        let s = sentiments(&articles, 0.5);
        let now = "2026-07-30T12:00:00Z".parse().unwrap();

        let result = synthesizer.synthesize(&articles, &s, 3, None, now).await;
        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains(CARD_GENERATION_DEGRADED));
    }

    #[tokio::test]
    async fn empty_input_produces_no_cards_and_no_warnings() {
        let synthesizer = CardSynthesizer::new(Arc::new(MockLlm::reliable()));
        let now = "2026-07-30T12:00:00Z".parse().unwrap();
        let result = synthesizer
            .synthesize(&[], &HashMap::new(), 5, None, now)
            .await;
        assert!(result.cards.is_empty());
        assert!(result.warnings.is_empty());
    }
}
