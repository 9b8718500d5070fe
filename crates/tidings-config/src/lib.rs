// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Tidings news pipeline.
//!
//! Layered TOML + environment configuration via Figment, with strict
//! unknown-key rejection and a collect-all-errors validation pass.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TidingsConfig;
pub use validation::{ConfigError, validate_config};
