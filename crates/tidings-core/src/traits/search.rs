// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Search adapter trait for external news-search providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::TidingsError;
use crate::traits::adapter::Adapter;
use crate::types::RawArticle;

/// Relative lookback window for a news search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
pub enum Lookback {
    #[strum(serialize = "1d")]
    #[serde(rename = "1d")]
    Day,
    #[strum(serialize = "1w")]
    #[serde(rename = "1w")]
    Week,
    #[strum(serialize = "1m")]
    #[serde(rename = "1m")]
    Month,
    #[strum(serialize = "1y")]
    #[serde(rename = "1y")]
    Year,
}

/// Options for one search invocation.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of articles to return.
    pub num: usize,
    /// Language code (e.g. "en").
    pub language: String,
    /// Country code (e.g. "us").
    pub country: String,
    pub window: Lookback,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            num: 10,
            language: "en".to_string(),
            country: "us".to_string(),
            window: Lookback::Day,
        }
    }
}

/// Adapter for external news-search providers.
///
/// One invocation issues one outbound call and returns between 0 and
/// `opts.num` articles, deduplicated by URL within the response.
#[async_trait]
pub trait SearchAdapter: Adapter {
    async fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<RawArticle>, TidingsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lookback_parses_relative_windows() {
        assert_eq!(Lookback::from_str("1d").unwrap(), Lookback::Day);
        assert_eq!(Lookback::from_str("1w").unwrap(), Lookback::Week);
        assert_eq!(Lookback::from_str("1m").unwrap(), Lookback::Month);
        assert_eq!(Lookback::from_str("1y").unwrap(), Lookback::Year);
        assert!(Lookback::from_str("2h").is_err());
    }
}
