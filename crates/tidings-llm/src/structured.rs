// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of JSON objects from free-form model text.
//!
//! Models frequently wrap JSON in Markdown fences or preface it with prose.
//! The extractor scans for the first balanced `{...}` region that parses.

/// Finds and parses the first JSON object embedded in `text`.
///
/// Returns `None` when no balanced region parses as a JSON object.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    // Fast path: the whole reply is the object.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim())
        && value.is_object()
    {
        return Some(value);
    }

    let bytes = text.as_bytes();
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start.unwrap()..=i];
                        if let Ok(value) =
                            serde_json::from_str::<serde_json::Value>(candidate)
                            && value.is_object()
                        {
                            return Some(value);
                        }
                        // Malformed candidate; keep scanning.
                        start = None;
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_object() {
        let value = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn extracts_fenced_object() {
        let text = "Here is the card:\n```json\n{\"headline\": \"News\"}\n```\nDone.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["headline"], "News");
    }

    #[test]
    fn extracts_nested_object_with_braces_in_strings() {
        let text = r#"prefix {"a": {"b": "curly } inside"}, "c": [1, 2]} suffix"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["a"]["b"], "curly } inside");
    }

    #[test]
    fn returns_none_for_prose() {
        assert!(extract_json_object("no structure here").is_none());
    }

    #[test]
    fn returns_none_for_bare_array() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }
}
