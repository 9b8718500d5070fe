// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tidings news pipeline.
//!
//! This crate provides the domain types, the error taxonomy, and the
//! adapter traits used throughout the Tidings workspace. Providers and
//! stores implement traits defined here; orchestration crates consume them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TidingsError;
pub use traits::{
    Adapter, CompletionAdapter, EmbeddingAdapter, HealthStatus, SearchAdapter,
};
