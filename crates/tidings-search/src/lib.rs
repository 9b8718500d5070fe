// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! News search adapter for the Tidings pipeline.
//!
//! Wraps a SerpAPI-shaped provider behind the [`SearchAdapter`] trait with
//! token-bucket rate limiting and exponential back-off on 429/503.
//!
//! [`SearchAdapter`]: tidings_core::traits::SearchAdapter

pub mod rate;
pub mod serp;

pub use rate::TokenBucket;
pub use serp::SerpSearch;
