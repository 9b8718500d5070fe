// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tidings pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tidings configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidingsConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// News search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// LLM completion provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Document store and vector index persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Pipeline orchestration settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Retrieval engine settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Dialogue session settings.
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// User memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

/// News search provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Search provider API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider endpoint base URL.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    /// Token-bucket ceiling: requests allowed per minute.
    #[serde(default = "default_search_rate_per_minute")]
    pub rate_per_minute: u32,

    /// Maximum in-flight search calls (process-global).
    #[serde(default = "default_provider_concurrency")]
    pub concurrency: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_base_url(),
            timeout_secs: default_search_timeout_secs(),
            rate_per_minute: default_search_rate_per_minute(),
            concurrency: default_provider_concurrency(),
        }
    }
}

/// LLM completion provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// LLM provider API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API version header value.
    #[serde(default = "default_llm_api_version")]
    pub api_version: String,

    /// Model identifier for completions.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Provider endpoint base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum in-flight completion calls (process-global).
    #[serde(default = "default_provider_concurrency")]
    pub concurrency: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_version: default_llm_api_version(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
            concurrency: default_provider_concurrency(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Embedding provider API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider endpoint base URL.
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Fixed output vector dimension.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Maximum texts per embedding batch.
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Per-batch timeout in seconds.
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum in-flight embedding calls (process-global).
    #[serde(default = "default_provider_concurrency")]
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
            concurrency: default_provider_concurrency(),
        }
    }
}

/// Persistence configuration for the document store and vector index.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Store operation timeout in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for API routes (None = auth disabled, requests rejected).
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// CORS allowed origins; empty means same-origin only.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Signing secret handed to the external auth collaborator.
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            cors_allowed_origins: Vec::new(),
            jwt_secret: None,
        }
    }
}

/// Pipeline orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Overall pipeline deadline in seconds.
    #[serde(default = "default_pipeline_deadline_secs")]
    pub deadline_secs: u64,

    /// Days a finished run is retained before TTL eviction.
    #[serde(default = "default_run_ttl_days")]
    pub run_ttl_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_pipeline_deadline_secs(),
            run_ttl_days: default_run_ttl_days(),
        }
    }
}

/// Retrieval engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Similarity floor below which results are dropped.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,

    /// Vector index query timeout in seconds.
    #[serde(default = "default_vector_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_floor: default_similarity_floor(),
            query_timeout_secs: default_vector_query_timeout_secs(),
        }
    }
}

/// Dialogue session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogueConfig {
    /// Per-turn deadline in seconds.
    #[serde(default = "default_turn_deadline_secs")]
    pub turn_deadline_secs: u64,

    /// Hard cap on stored turns before the oldest half is summarized.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Model context window in tokens, used for history budgeting.
    #[serde(default = "default_context_window_tokens")]
    pub context_window_tokens: usize,

    /// Generation temperature.
    #[serde(default = "default_dialogue_temperature")]
    pub temperature: f32,

    /// Generation token cap.
    #[serde(default = "default_dialogue_max_tokens")]
    pub max_tokens: u32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            turn_deadline_secs: default_turn_deadline_secs(),
            history_cap: default_history_cap(),
            context_window_tokens: default_context_window_tokens(),
            temperature: default_dialogue_temperature(),
            max_tokens: default_dialogue_max_tokens(),
        }
    }
}

/// User memory configuration. The decay and weight numbers are tunables,
/// not constants; the defaults follow the interest-vector model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Interest-vector decay half-life in days.
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,

    /// Per-action interest weights.
    #[serde(default = "default_weight_query")]
    pub weight_query: f64,
    #[serde(default = "default_weight_view")]
    pub weight_view: f64,
    #[serde(default = "default_weight_like")]
    pub weight_like: f64,
    #[serde(default = "default_weight_share")]
    pub weight_share: f64,
    #[serde(default = "default_weight_dwell")]
    pub weight_dwell: f64,
    #[serde(default = "default_weight_dialogue_turn")]
    pub weight_dialogue_turn: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_half_life_days(),
            weight_query: default_weight_query(),
            weight_view: default_weight_view(),
            weight_like: default_weight_like(),
            weight_share: default_weight_share(),
            weight_dwell: default_weight_dwell(),
            weight_dialogue_turn: default_weight_dialogue_turn(),
        }
    }
}

fn default_agent_name() -> String {
    "tidings".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_search_base_url() -> String {
    "https://serpapi.com/search.json".to_string()
}
fn default_search_timeout_secs() -> u64 {
    20
}
fn default_search_rate_per_minute() -> u32 {
    60
}
fn default_provider_concurrency() -> usize {
    4
}
fn default_llm_api_version() -> String {
    "2023-06-01".to_string()
}
fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_embedding_base_url() -> String {
    "https://api.voyageai.com/v1/embeddings".to_string()
}
fn default_embedding_model() -> String {
    "voyage-3".to_string()
}
fn default_embedding_dimension() -> usize {
    1024
}
fn default_embedding_batch_size() -> usize {
    32
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_database_path() -> String {
    "tidings.db".to_string()
}
fn default_store_timeout_secs() -> u64 {
    10
}
fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}
fn default_gateway_port() -> u16 {
    8080
}
fn default_pipeline_deadline_secs() -> u64 {
    300
}
fn default_run_ttl_days() -> u32 {
    7
}
fn default_similarity_floor() -> f32 {
    0.2
}
fn default_vector_query_timeout_secs() -> u64 {
    5
}
fn default_turn_deadline_secs() -> u64 {
    120
}
fn default_history_cap() -> usize {
    30
}
fn default_context_window_tokens() -> usize {
    32_768
}
fn default_dialogue_temperature() -> f32 {
    0.7
}
fn default_dialogue_max_tokens() -> u32 {
    1_200
}
fn default_half_life_days() -> f64 {
    14.0
}
fn default_weight_query() -> f64 {
    1.0
}
fn default_weight_view() -> f64 {
    0.3
}
fn default_weight_like() -> f64 {
    1.5
}
fn default_weight_share() -> f64 {
    1.2
}
fn default_weight_dwell() -> f64 {
    0.4
}
fn default_weight_dialogue_turn() -> f64 {
    0.8
}
fn default_true() -> bool {
    true
}
