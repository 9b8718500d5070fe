// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tidings news pipeline.
//!
//! The variants form a stable taxonomy: each maps to a `kind()` tag that is
//! carried across the HTTP surface unchanged, so callers can branch on the
//! tag without parsing human-readable messages.

use thiserror::Error;

/// The primary error type used across all Tidings components.
#[derive(Debug, Error)]
pub enum TidingsError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// An external provider exhausted its retry budget.
    #[error("provider `{provider}` unavailable: {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An external provider rejected the call for rate-limit reasons.
    ///
    /// Distinct from [`ProviderUnavailable`](Self::ProviderUnavailable) so the
    /// orchestrator can degrade a stage instead of aborting the run.
    #[error("provider `{provider}` rate limited")]
    ProviderRateLimited { provider: String },

    /// Upstream returned an unparseable or schema-violating payload.
    #[error("invalid response from `{provider}`: {message}")]
    InvalidResponse { provider: String, message: String },

    /// The composed prompt exceeded the model context window. Not retryable.
    #[error("prompt exceeded model context window: {0}")]
    ContextOverflow(String),

    /// The model declined the required output schema after one repair attempt.
    #[error("model output did not match the required schema: {0}")]
    UnstructuredOutput(String),

    /// The document store is down or a store operation failed.
    #[error("document store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The vector index is down or an index operation failed.
    #[error("vector index unavailable: {source}")]
    IndexUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A session, run, user, or article was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A second chat turn targeted a session with a turn already in flight.
    #[error("session `{session_id}` has a turn in flight")]
    SessionBusy { session_id: String },

    /// A second pipeline run was requested while one is active for the user.
    #[error("a pipeline run is already active for user `{user_id}`")]
    BusyRetry { user_id: String },

    /// An orchestrator or turn deadline expired.
    #[error("deadline of {seconds}s exceeded")]
    DeadlineExceeded { seconds: u64 },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors. Detail is never surfaced to users.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidingsError {
    /// Stable taxonomy tag for this error, carried across transports.
    pub fn kind(&self) -> &'static str {
        match self {
            TidingsError::Config(_) => "config",
            TidingsError::ProviderUnavailable { .. } => "provider_unavailable",
            TidingsError::ProviderRateLimited { .. } => "provider_rate_limited",
            TidingsError::InvalidResponse { .. } => "invalid_response",
            TidingsError::ContextOverflow(_) => "context_overflow",
            TidingsError::UnstructuredOutput(_) => "unstructured_output",
            TidingsError::StoreUnavailable { .. } => "store_unavailable",
            TidingsError::IndexUnavailable { .. } => "index_unavailable",
            TidingsError::NotFound { .. } => "not_found",
            TidingsError::SessionBusy { .. } => "session_busy",
            TidingsError::BusyRetry { .. } => "busy_retry",
            TidingsError::DeadlineExceeded { .. } => "deadline_exceeded",
            TidingsError::Cancelled => "cancelled",
            TidingsError::Internal(_) => "internal",
        }
    }

    /// True when the orchestrator may degrade the stage rather than abort.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            TidingsError::ProviderRateLimited { .. }
                | TidingsError::ProviderUnavailable { .. }
                | TidingsError::IndexUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_tags() {
        let cases: Vec<(TidingsError, &str)> = vec![
            (TidingsError::Config("x".into()), "config"),
            (
                TidingsError::ProviderUnavailable {
                    provider: "search".into(),
                    message: "retries exhausted".into(),
                    source: None,
                },
                "provider_unavailable",
            ),
            (
                TidingsError::ProviderRateLimited {
                    provider: "llm".into(),
                },
                "provider_rate_limited",
            ),
            (
                TidingsError::NotFound {
                    entity: "session",
                    id: "s-1".into(),
                },
                "not_found",
            ),
            (TidingsError::DeadlineExceeded { seconds: 300 }, "deadline_exceeded"),
            (TidingsError::Cancelled, "cancelled"),
        ];
        for (err, tag) in cases {
            assert_eq!(err.kind(), tag);
        }
    }

    #[test]
    fn rate_limited_is_degradable_but_context_overflow_is_not() {
        let rl = TidingsError::ProviderRateLimited {
            provider: "search".into(),
        };
        assert!(rl.is_degradable());
        assert!(!TidingsError::ContextOverflow("too long".into()).is_degradable());
    }
}
