// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, sane ranges, and non-empty
//! paths.

use thiserror::Error;

use crate::model::TidingsConfig;

/// A semantic configuration error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &TidingsConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::new("gateway.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::new(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::new("storage.database_path must not be empty"));
    }

    if config.pipeline.deadline_secs == 0 {
        errors.push(ConfigError::new("pipeline.deadline_secs must be positive"));
    }

    if config.dialogue.history_cap < 2 {
        errors.push(ConfigError::new(format!(
            "dialogue.history_cap must be at least 2, got {}",
            config.dialogue.history_cap
        )));
    }

    if !(0.0..=1.0).contains(&config.retrieval.similarity_floor) {
        errors.push(ConfigError::new(format!(
            "retrieval.similarity_floor must be in [0, 1], got {}",
            config.retrieval.similarity_floor
        )));
    }

    if config.memory.half_life_days <= 0.0 {
        errors.push(ConfigError::new(format!(
            "memory.half_life_days must be positive, got {}",
            config.memory.half_life_days
        )));
    }

    if config.embedding.dimension == 0 {
        errors.push(ConfigError::new("embedding.dimension must be positive"));
    }

    if config.embedding.batch_size == 0 || config.embedding.batch_size > 32 {
        errors.push(ConfigError::new(format!(
            "embedding.batch_size must be in 1..=32, got {}",
            config.embedding.batch_size
        )));
    }

    if config.search.rate_per_minute == 0 {
        errors.push(ConfigError::new("search.rate_per_minute must be positive"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TidingsConfig;

    #[test]
    fn default_config_validates() {
        let config = TidingsConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn validation_collects_every_error() {
        let mut config = TidingsConfig::default();
        config.gateway.host = "".to_string();
        config.pipeline.deadline_secs = 0;
        config.retrieval.similarity_floor = 1.5;
        config.embedding.batch_size = 64;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "all violations must be reported: {errors:?}");
    }

    #[test]
    fn oversized_embed_batch_is_rejected() {
        let mut config = TidingsConfig::default();
        config.embedding.batch_size = 33;
        assert!(validate_config(&config).is_err());
    }
}
