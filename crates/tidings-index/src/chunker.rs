// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Article chunking for the embedding indexer.
//!
//! Chunk 0 is the title and summary concatenated, bounded at 512 tokens.
//! Body text (when present) is split at paragraph boundaries and windowed
//! at <= 400 tokens with a 40-token overlap; body windows shorter than 40
//! tokens are dropped. Chunk 0 is always kept so every article stays
//! addressable from its headline.

use tidings_core::types::{Article, Chunk, ChunkField};

/// Chunk 0 (title + summary) token bound.
const LEAD_CHUNK_TOKENS: u32 = 512;
/// Body window token bound.
const WINDOW_TOKENS: u32 = 400;
/// Overlap carried between consecutive body windows.
const OVERLAP_TOKENS: u32 = 40;
/// Body windows below this size are dropped.
const MIN_CHUNK_TOKENS: u32 = 40;

/// Token estimate used uniformly for chunk windowing and dialogue context
/// budgeting: characters divided by four, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// Cuts an article into embedding-addressable chunks with contiguous
/// 0-based ordinals.
pub fn chunk_article(article: &Article) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    let lead = truncate_to_tokens(
        &format!("{}\n{}", article.title.trim(), article.summary.trim()),
        LEAD_CHUNK_TOKENS,
    );
    chunks.push(Chunk {
        article: article.fingerprint,
        ordinal: 0,
        token_count: estimate_tokens(&lead),
        text: lead,
        field: ChunkField::Summary,
    });

    if let Some(body) = article.body.as_deref() {
        for window in window_body(body) {
            let token_count = estimate_tokens(&window);
            if token_count < MIN_CHUNK_TOKENS {
                continue;
            }
            chunks.push(Chunk {
                article: article.fingerprint,
                ordinal: chunks.len() as u32,
                text: window,
                token_count,
                field: ChunkField::Body,
            });
        }
    }

    chunks
}

/// Splits body text into paragraph-aligned windows of at most
/// `WINDOW_TOKENS` tokens, carrying `OVERLAP_TOKENS` of trailing context
/// into each next window.
fn window_body(body: &str) -> Vec<String> {
    let mut units: Vec<String> = Vec::new();
    for paragraph in body.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if estimate_tokens(paragraph) <= WINDOW_TOKENS {
            units.push(paragraph.to_string());
        } else {
            // An over-long paragraph is windowed at the word level.
            units.extend(split_long_paragraph(paragraph).into_iter().map(str::to_string));
        }
    }

    let mut windows: Vec<String> = Vec::new();
    let mut current = String::new();

    for unit in units {
        if !current.is_empty()
            && estimate_tokens(&current) + estimate_tokens(&unit) > WINDOW_TOKENS
        {
            // Seed the next window with the tail of this one.
            let overlap = tail_tokens(&current, OVERLAP_TOKENS);
            windows.push(std::mem::take(&mut current));
            current = overlap;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&unit);
    }
    if !current.is_empty() {
        windows.push(current);
    }
    windows
}

/// Word-level windowing for paragraphs larger than a whole window.
fn split_long_paragraph(paragraph: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let bytes_per_window = (WINDOW_TOKENS * 4) as usize;
    let mut start = 0;
    while start < paragraph.len() {
        let end = next_boundary(paragraph, start + bytes_per_window);
        pieces.push(paragraph[start..end].trim());
        if end == paragraph.len() {
            break;
        }
        // Step back by the overlap, staying on a char boundary.
        let overlap_bytes = (OVERLAP_TOKENS * 4) as usize;
        start = next_boundary(paragraph, end.saturating_sub(overlap_bytes));
        if start >= end {
            break;
        }
    }
    pieces
}

/// The closest char boundary at or after `at`, clamped to the text length.
fn next_boundary(text: &str, at: usize) -> usize {
    if at >= text.len() {
        return text.len();
    }
    let mut i = at;
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// The last ~`tokens` worth of a window, cut at a word boundary.
fn tail_tokens(text: &str, tokens: u32) -> String {
    let budget_chars = (tokens * 4) as usize;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= budget_chars {
        return text.to_string();
    }
    let tail: String = chars[chars.len() - budget_chars..].iter().collect();
    // Drop the leading partial word.
    match tail.find(char::is_whitespace) {
        Some(i) => tail[i..].trim_start().to_string(),
        None => tail,
    }
}

/// Truncates text to a token budget on a word boundary.
fn truncate_to_tokens(text: &str, tokens: u32) -> String {
    let budget_chars = (tokens * 4) as usize;
    if text.chars().count() <= budget_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(budget_chars).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(i) => truncated[..i].to_string(),
        None => truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tidings_core::types::Fingerprint;
    use uuid::Uuid;

    fn article(title: &str, summary: &str, body: Option<&str>) -> Article {
        Article {
            fingerprint: Fingerprint(Uuid::nil()),
            title: title.to_string(),
            summary: summary.to_string(),
            body: body.map(str::to_string),
            url: None,
            source: "Wire".to_string(),
            author: None,
            published_at: Utc::now(),
            language: None,
            category: "general".to_string(),
            tags: Vec::new(),
            query: String::new(),
            discovered_at: Utc::now(),
            last_seen_at: Utc::now(),
        }
    }

    #[test]
    fn estimate_is_chars_over_four_rounded_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn short_article_yields_only_the_lead_chunk() {
        let chunks = chunk_article(&article("Title", "A short summary.", None));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].field, ChunkField::Summary);
        assert!(chunks[0].text.contains("Title"));
    }

    #[test]
    fn lead_chunk_is_bounded_at_512_tokens() {
        let long_summary = "word ".repeat(2_000);
        let chunks = chunk_article(&article("Title", &long_summary, None));
        assert!(chunks[0].token_count <= 512);
    }

    #[test]
    fn body_is_windowed_with_contiguous_ordinals() {
        let paragraph = "sentence with words in it. ".repeat(30); // ~200 tokens
        let body = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = chunk_article(&article("T", "S", Some(&body)));
        assert!(chunks.len() > 2, "body must produce windows: {}", chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i as u32);
        }
        for chunk in &chunks[1..] {
            assert_eq!(chunk.field, ChunkField::Body);
            assert!(chunk.token_count <= 400 + 40, "window over budget");
            assert!(chunk.token_count >= 40, "undersized window survived");
        }
    }

    #[test]
    fn tiny_body_fragments_are_dropped() {
        let chunks = chunk_article(&article("T", "S", Some("too short")));
        assert_eq!(chunks.len(), 1, "sub-40-token body must be dropped");
    }

    #[test]
    fn consecutive_windows_share_overlap() {
        let paragraph = "alpha beta gamma delta epsilon zeta. ".repeat(120);
        let chunks = chunk_article(&article("T", "S", Some(&paragraph)));
        if chunks.len() > 2 {
            let first_body = &chunks[1].text;
            let second_body = &chunks[2].text;
            let tail: String = first_body
                .chars()
                .skip(first_body.chars().count().saturating_sub(40))
                .collect();
            let probe: &str = tail.split_whitespace().next().unwrap_or("");
            assert!(
                probe.is_empty() || second_body.contains(probe),
                "second window should carry tail context from the first"
            );
        }
    }
}
