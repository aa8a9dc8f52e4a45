//! Best-effort repair of almost-JSON model output before strict parsing.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Normalize a model response toward strict JSON: drop fenced-code markers,
/// keep only the first `{...}` span, swap single quotes for double quotes,
/// and remove trailing commas. Idempotent: repairing a repaired string is a
/// no-op.
pub fn repair_json(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if text.contains("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            text = text[start..=end].to_string();
        }
    }

    text = text.replace('\'', "\"");
    TRAILING_COMMA_RE.replace_all(&text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fences_and_extracts_object() {
        let raw = "```json\n{\"domains\": [\"file\"]}\n```\nsure, here you go";
        assert_eq!(repair_json(raw), "{\"domains\": [\"file\"]}");
    }

    #[test]
    fn test_single_quotes_become_double() {
        let raw = "{'domains': ['network'], 'complexity': 2}";
        let repaired = repair_json(raw);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn test_trailing_commas_removed() {
        let raw = "{\"domains\": [\"file\",], \"complexity\": 2,}";
        let repaired = repair_json(raw);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn test_surrounding_prose_dropped() {
        let raw = "The intent is: {\"domains\": [\"log\"]} hope that helps";
        assert_eq!(repair_json(raw), "{\"domains\": [\"log\"]}");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "```json\n{'a': 1,}\n```",
            "{\"domains\": [\"file\"]}",
            "no json at all",
            "{'nested': {'x': [1, 2,],},}",
            "",
        ];
        for input in inputs {
            let once = repair_json(input);
            assert_eq!(repair_json(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_unparseable_input_passes_through() {
        let repaired = repair_json("I cannot answer that");
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_err());
    }
}
