// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Tidings workspace.
//!
//! These are the tagged records the pipeline and dialogue engine pass
//! between components. Unrecognized fields on ingress are discarded by
//! serde rather than attached dynamically.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Stable identity key for an article.
///
/// Computed from the lowercased canonical URL (preferred) or a hash of
/// title, source, and published day. Only the article store computes
/// fingerprints; every other component treats them as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub Uuid);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An article as returned by the search provider, before the store has
/// assigned it a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    /// Headline. Never empty; records without a title are rejected upstream.
    pub title: String,
    /// Provider snippet or summary.
    pub summary: String,
    /// Full text when the provider supplies it.
    pub body: Option<String>,
    /// Canonical URL. Absent for some wire formats.
    pub url: Option<String>,
    /// Publishing outlet name.
    pub source: String,
    pub author: Option<String>,
    /// Publication instant; day granularity is acceptable.
    pub published_at: Option<DateTime<Utc>>,
    /// Detected language code (e.g. "en").
    pub language: Option<String>,
    /// Free-form category assigned by the provider, if any.
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// The normalized, persisted unit of news.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub fingerprint: Fingerprint,
    pub title: String,
    pub summary: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub source: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub language: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    /// The query that first surfaced this article.
    pub query: String,
    /// First discovery timestamp.
    pub discovered_at: DateTime<Utc>,
    /// Refreshed whenever a duplicate upsert sees the article again.
    pub last_seen_at: DateTime<Utc>,
}

/// Which article field a chunk was cut from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChunkField {
    Title,
    Summary,
    Body,
}

/// An embedding-addressable fragment of an article.
///
/// Identity is (article fingerprint, ordinal); ordinals are 0-based and
/// contiguous within an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub article: Fingerprint,
    pub ordinal: u32,
    pub text: String,
    pub token_count: u32,
    pub field: ChunkField,
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    /// L2-normalized at write time so similarity queries are dot products.
    pub vector: Vec<f32>,
}

/// Sentiment polarity label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

/// Per-text sentiment verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Absolute strength of the dominant polarity, in [0, 1].
    pub magnitude: f32,
    /// Scorer confidence, in [0, 1].
    pub confidence: f32,
}

impl Sentiment {
    /// A neutral verdict with zero magnitude.
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            magnitude: 0.0,
            confidence: 1.0,
        }
    }
}

/// Aggregate sentiment distribution over one pipeline run's articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentOverview {
    pub total_analyzed: usize,
    /// Per-label counts; absent labels scored zero.
    pub counts: BTreeMap<SentimentLabel, usize>,
    /// Per-label percentages of `total_analyzed`, rounded to two decimals.
    pub percentages: BTreeMap<SentimentLabel, f32>,
    /// Dominant label across the corpus.
    pub overall: SentimentLabel,
}

/// A ranked, structured extract of one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsCard {
    pub article: Fingerprint,
    pub headline: String,
    /// 2-4 sentence summary.
    pub summary: String,
    /// 3-6 key-point bullets.
    pub key_points: Vec<String>,
    pub sentiment: Sentiment,
    pub topic_tags: Vec<String>,
    /// Source credibility in [0, 1].
    pub source_credibility: f32,
    /// Deterministic importance score in [0, 100].
    pub importance: f32,
    /// Display priority in [1, 10]; rank 1 maps to 10.
    pub priority: u8,
    pub generated_at: DateTime<Utc>,
}

/// Interaction kinds recorded against a user's memory profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    Query,
    View,
    Like,
    Share,
    Dwell,
    DialogueTurn,
}

/// One append-only entry in a user's interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    pub user_id: String,
    pub at: DateTime<Utc>,
    pub kind: InteractionKind,
    /// Article fingerprint or session id the interaction targeted.
    pub target: Option<String>,
    /// Query text or message text associated with the interaction.
    pub text: Option<String>,
    /// Interaction importance in [0, 1].
    pub importance: f32,
}

/// Response-style preferences a user can set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylePreferences {
    /// "short", "medium", or "long".
    pub response_length: String,
    /// "casual", "neutral", or "formal".
    pub formality: String,
    /// "overview" or "deep".
    pub detail_depth: String,
    /// How strongly personalization influences ranking and prompting, in [0, 1].
    pub personalization_level: f32,
}

impl Default for StylePreferences {
    fn default() -> Self {
        Self {
            response_length: "medium".to_string(),
            formality: "neutral".to_string(),
            detail_depth: "overview".to_string(),
            personalization_level: 0.5,
        }
    }
}

/// Monotonic per-user engagement counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProfileCounters {
    pub queries_issued: u64,
    pub articles_viewed: u64,
    pub cards_liked: u64,
}

/// Derived per-user memory profile.
///
/// The interaction log is the source of truth; every derived field here can
/// be rebuilt from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// Running weighted mean of interaction-text embeddings. Empty until the
    /// first embeddable interaction.
    pub interest_vector: Vec<f32>,
    /// Total decayed weight behind `interest_vector`; needed to fold new
    /// observations into the running mean incrementally.
    pub interest_weight: f64,
    /// Raw decayed per-category weight accumulator. `category_weights` is
    /// this map normalized to sum 1.
    pub category_accumulator: BTreeMap<String, f64>,
    /// Normalized category -> weight mapping in [0, 1].
    pub category_weights: BTreeMap<String, f32>,
    pub preferred_sources: Vec<String>,
    pub style: StylePreferences,
    pub counters: ProfileCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh profile for a first-time user.
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            interest_vector: Vec::new(),
            interest_weight: 0.0,
            category_accumulator: BTreeMap::new(),
            category_weights: BTreeMap::new(),
            preferred_sources: Vec::new(),
            style: StylePreferences::default(),
            counters: ProfileCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single stored dialogue message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Role of a dialogue message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Synthetic notes such as pruning summaries.
    System,
}

/// A persisted dialogue session. Messages are stored separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: String,
    pub user_id: String,
    /// Pipeline run that seeded this session, when the chat is scoped to
    /// a just-processed corpus.
    pub run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One result from the retrieval engine, attributed to its source article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub article: Fingerprint,
    pub ordinal: u32,
    pub text: String,
    pub title: String,
    pub url: Option<String>,
    pub source: String,
    pub published_at: DateTime<Utc>,
    /// Final blended score after re-ranking.
    pub score: f32,
    /// Raw cosine similarity against the query, before re-ranking.
    pub similarity: f32,
}

/// Pipeline stages in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Search,
    Store,
    Index,
    Sentiment,
    Analysis,
    Cards,
    Memory,
}

/// Outcome of one pipeline stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    Skipped,
    Failed,
    Cancelled,
}

/// Per-stage execution record on a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    /// Taxonomy tag of the failure, when `outcome` is `Failed`.
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Terminal status of a pipeline run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failed,
}

/// Aggregate counts for one pipeline run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub found: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub indexed_chunks: usize,
    pub cards: usize,
}

/// Request shape for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub query: String,
    #[serde(default)]
    pub user_id: String,
    /// Result count; default 10, capped at 100.
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    /// Card count; default 5, capped at 10.
    #[serde(default = "default_max_cards")]
    pub max_cards: usize,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    /// Relative lookback window: "1d", "1w", "1m", or "1y".
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default = "default_true")]
    pub store: bool,
    #[serde(default = "default_true")]
    pub index: bool,
    #[serde(default = "default_true")]
    pub analyze: bool,
    #[serde(default = "default_true")]
    pub cards: bool,
    #[serde(default = "default_true")]
    pub sentiment: bool,
    #[serde(default = "default_true")]
    pub memory_update: bool,
    /// When true, a request that collides with an in-flight run for the same
    /// user waits behind it (bounded depth 1) instead of failing `BusyRetry`.
    #[serde(default)]
    pub queue: bool,
}

impl PipelineRequest {
    /// A request with every stage enabled and defaults applied.
    pub fn full(query: &str, user_id: &str) -> Self {
        Self {
            query: query.to_string(),
            user_id: user_id.to_string(),
            num_results: default_num_results(),
            max_cards: default_max_cards(),
            language: default_language(),
            country: default_country(),
            window: default_window(),
            store: true,
            index: true,
            analyze: true,
            cards: true,
            sentiment: true,
            memory_update: true,
            queue: false,
        }
    }

    /// The quick variant: search and cards only, nothing persisted.
    pub fn quick(query: &str, user_id: &str) -> Self {
        Self {
            store: false,
            index: false,
            analyze: false,
            sentiment: false,
            memory_update: false,
            ..Self::full(query, user_id)
        }
    }

    /// Clamp count fields to their documented caps.
    pub fn clamped(mut self) -> Self {
        self.num_results = self.num_results.min(100);
        self.max_cards = self.max_cards.min(10);
        self
    }
}

fn default_num_results() -> usize {
    10
}
fn default_max_cards() -> usize {
    5
}
fn default_language() -> String {
    "en".to_string()
}
fn default_country() -> String {
    "us".to_string()
}
fn default_window() -> String {
    "1d".to_string()
}
fn default_true() -> bool {
    true
}

/// Freshness signal shared by card ranking and retrieval re-ranking:
/// `exp(-age_hours / 48)`, clamped to [0.05, 1].
pub fn recency_decay(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let age_hours = (now - published_at).num_minutes() as f32 / 60.0;
    (-age_hours.max(0.0) / 48.0).exp().clamp(0.05, 1.0)
}

/// The aggregate result of one end-to-end pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub user_id: String,
    pub query: String,
    pub status: RunStatus,
    /// Stages in execution order.
    pub stages: Vec<StageRecord>,
    pub counts: RunCounts,
    pub articles: Vec<Article>,
    pub cards: Vec<NewsCard>,
    pub analysis: Option<String>,
    pub sentiment_overview: Option<SentimentOverview>,
    pub recommended_queries: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}
