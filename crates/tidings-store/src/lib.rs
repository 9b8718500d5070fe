// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Tidings pipeline.
//!
//! One database file holds articles, the interaction log, profile
//! documents, dialogue sessions, retained pipeline runs, and (via the
//! shared connection) the vector index's chunk table. All writes are
//! serialized through tokio-rusqlite's single background thread.

pub mod database;
pub mod fingerprint;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::{ArticleFilter, DocumentStore, UpsertOutcome};
