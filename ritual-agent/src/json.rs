//! Extraction of a JSON object from free-form model output.
//!
//! Models wrap JSON in code fences or add a sentence before it. The first
//! balanced top-level object is taken; strings are scanned so braces inside
//! them do not count.

use serde_json::Value;

/// First JSON object found in `content`, if any.
pub fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let bytes = trimmed.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
        search_from = start + 1;
    }
    None
}

fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let value = extract_json(r#" {"a": 1} "#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_fenced_with_preamble() {
        let content = "Here is your plan:\n```json\n{\"title\": \"Guitar {basics}\", \"n\": [1,2]}\n```\nEnjoy!";
        let value = extract_json(content).unwrap();
        assert_eq!(value["title"], "Guitar {basics}");
    }

    #[test]
    fn test_skips_invalid_candidate() {
        let value = extract_json("{not json} then {\"ok\": true}").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json("music").is_none());
        assert!(extract_json("[1, 2]").is_none());
        assert!(extract_json("{\"unterminated\": ").is_none());
    }

    #[test]
    fn test_excerpt_respects_chars() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("ab", 400), "ab");
    }
}
