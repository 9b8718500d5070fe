// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole-corpus analysis, sentiment aggregation, and recommended queries.

use std::collections::BTreeMap;

use tidings_core::TidingsError;
use tidings_core::traits::{ChatMessage, CompletionAdapter, CompletionRequest};
use tidings_core::types::{Article, Sentiment, SentimentLabel, SentimentOverview, UserProfile};
use tidings_memory::top_categories;

/// System prompt for the run-level analysis summary.
const ANALYSIS_PROMPT: &str = "You are a news analyst. Given a user's query and a set \
of fresh articles, write a structured Markdown analysis with these sections: \
main events, key trends, notable viewpoints, and potential impact. Stay \
objective and fact-based, emphasize what is relevant to the query, and keep \
the whole analysis under 300 words.";

/// Articles fed to the analysis call; more would waste the token budget.
const ANALYSIS_ARTICLE_CAP: usize = 5;

/// Produces the whole-corpus analysis summary for a run.
pub async fn generate_analysis(
    llm: &dyn CompletionAdapter,
    query: &str,
    articles: &[Article],
) -> Result<String, TidingsError> {
    let corpus = articles
        .iter()
        .take(ANALYSIS_ARTICLE_CAP)
        .map(|a| format!("Title: {}\nContent: {}", a.title, a.summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    let request = CompletionRequest {
        system: Some(ANALYSIS_PROMPT.to_string()),
        messages: vec![ChatMessage::user(format!(
            "Query: {query}\n\nArticles:\n{corpus}"
        ))],
        temperature: Some(0.3),
        max_tokens: Some(500),
    };
    Ok(llm.complete(request).await?.text)
}

/// Aggregates per-article verdicts into the run-level overview.
pub fn sentiment_overview(sentiments: &[Sentiment]) -> Option<SentimentOverview> {
    if sentiments.is_empty() {
        return None;
    }
    let mut counts: BTreeMap<SentimentLabel, usize> = BTreeMap::new();
    for label in [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ] {
        counts.insert(label, 0);
    }
    for s in sentiments {
        *counts.entry(s.label).or_insert(0) += 1;
    }

    let total = sentiments.len();
    let percentages: BTreeMap<SentimentLabel, f32> = counts
        .iter()
        .map(|(label, count)| {
            (*label, ((*count as f32 / total as f32) * 10_000.0).round() / 100.0)
        })
        .collect();

    let positive = counts[&SentimentLabel::Positive];
    let negative = counts[&SentimentLabel::Negative];
    let overall = if positive > negative {
        SentimentLabel::Positive
    } else if negative > positive {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    Some(SentimentOverview {
        total_analyzed: total,
        counts,
        percentages,
        overall,
    })
}

/// Default suggestions for users with no learned interests yet.
const DEFAULT_RECOMMENDATIONS: &[&str] = &[
    "technology news",
    "business headlines",
    "science breakthroughs",
    "world events",
];

/// Up to five follow-up queries derived from the user's top categories.
pub fn recommended_queries(profile: Option<&UserProfile>) -> Vec<String> {
    let from_profile: Vec<String> = profile
        .map(|p| {
            top_categories(p, 5)
                .into_iter()
                .map(|(category, _)| format!("{category} latest developments"))
                .collect()
        })
        .unwrap_or_default();

    if from_profile.is_empty() {
        DEFAULT_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        from_profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sentiment(label: SentimentLabel) -> Sentiment {
        Sentiment {
            label,
            magnitude: 0.5,
            confidence: 0.8,
        }
    }

    #[test]
    fn overview_counts_sum_and_percentages_round() {
        let overview = sentiment_overview(&[
            sentiment(SentimentLabel::Positive),
            sentiment(SentimentLabel::Positive),
            sentiment(SentimentLabel::Negative),
        ])
        .unwrap();
        assert_eq!(overview.total_analyzed, 3);
        assert_eq!(overview.counts[&SentimentLabel::Positive], 2);
        assert_eq!(overview.counts[&SentimentLabel::Neutral], 0);
        assert_eq!(overview.overall, SentimentLabel::Positive);
        assert!((overview.percentages[&SentimentLabel::Positive] - 66.67).abs() < 0.01);
    }

    #[test]
    fn balanced_polarity_is_neutral_overall() {
        let overview = sentiment_overview(&[
            sentiment(SentimentLabel::Positive),
            sentiment(SentimentLabel::Negative),
        ])
        .unwrap();
        assert_eq!(overview.overall, SentimentLabel::Neutral);
    }

    #[test]
    fn empty_input_has_no_overview() {
        assert!(sentiment_overview(&[]).is_none());
    }

    #[test]
    fn recommendations_prefer_profile_categories() {
        let mut profile = UserProfile::new("u", Utc::now());
        profile.category_weights.insert("technology".into(), 0.8);
        profile.category_weights.insert("finance".into(), 0.2);

        let recs = recommended_queries(Some(&profile));
        assert_eq!(recs[0], "technology latest developments");
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn empty_profile_falls_back_to_defaults() {
        let profile = UserProfile::new("u", Utc::now());
        let recs = recommended_queries(Some(&profile));
        assert_eq!(recs.len(), DEFAULT_RECOMMENDATIONS.len());
        assert!(recommended_queries(None).len() == DEFAULT_RECOMMENDATIONS.len());
    }
}
