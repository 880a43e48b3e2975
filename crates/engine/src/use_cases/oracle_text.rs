//! Cleanup and parsing of raw Oracle text.
//!
//! Character workers and the Director both ask for a single JSON object, but
//! local models wrap it in all sorts of noise: chat-template tokens, `<think>`
//! blocks, markdown fences and prose before or after the object. This module
//! strips that noise and deserializes the first complete object it finds.

use regex_lite::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

// Regex to remove model-specific special tokens (e.g., from gpt-oss, llama, etc.)
static SPECIAL_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // - <|...|> style tokens (common in many models)
    // - [INST], [/INST] tokens (llama)
    // - <<SYS>>, <</SYS>> tokens (llama)
    Regex::new(r"<\|[^|>]+\|>|\[/?INST\]|<</?SYS>>").expect("valid regex")
});

// gpt-oss: <|channel|>analysis<|message|>...<|end|><|start|>assistant<|channel|>final<|message|>CONTENT
static FINAL_CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\|channel\|>final<\|message\|>(.*)$").expect("valid regex"));

// Reasoning models think out loud before answering
static THINKING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>.*?</think>|<thinking>.*?</thinking>|<reasoning>.*?</reasoning>")
        .expect("valid regex")
});

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n?(.*?)```").expect("valid regex"));

/// Why Oracle text could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleParseError {
    #[error("oracle returned no content")]
    Empty,
    #[error("no JSON object found in oracle output")]
    NoJsonObject,
    #[error("oracle JSON did not match the expected shape: {0}")]
    Shape(String),
}

/// Remove model-specific special tokens that may leak through from Oracle output.
pub fn strip_special_tokens(raw: &str) -> String {
    if let Some(content) = FINAL_CONTENT_RE.captures(raw).and_then(|caps| caps.get(1)) {
        return SPECIAL_TOKENS_RE
            .replace_all(content.as_str().trim(), "")
            .to_string();
    }
    SPECIAL_TOKENS_RE.replace_all(raw, "").to_string()
}

/// Strip tokens, thinking blocks and markdown fences.
pub fn normalize(raw: &str) -> String {
    let cleaned = strip_special_tokens(raw);
    let cleaned = THINKING_RE.replace_all(&cleaned, "");
    // Prefer the first fenced block that holds an object
    let unfenced = FENCE_RE
        .captures_iter(&cleaned)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|body| body.contains('{'))
        .map(str::to_string)
        .unwrap_or_else(|| cleaned.replace("```", ""));
    unfenced.trim().to_string()
}

/// First balanced `{...}` span. Braces inside JSON strings do not count.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Normalize `raw` and deserialize the first JSON object in it.
pub fn parse_record<T: DeserializeOwned>(raw: &str) -> Result<T, OracleParseError> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(OracleParseError::Empty);
    }
    let json = extract_json_object(&normalized).ok_or(OracleParseError::NoJsonObject)?;
    serde_json::from_str(json).map_err(|e| {
        tracing::debug!(json, error = %e, "Oracle JSON rejected");
        OracleParseError::Shape(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Line {
        dialogue: String,
    }

    #[test]
    fn parses_a_bare_object() {
        let parsed: Line = parse_record(r#"{"dialogue": "Hold the light steady."}"#).unwrap();
        assert_eq!(parsed.dialogue, "Hold the light steady.");
    }

    #[test]
    fn strips_think_blocks_and_fences() {
        let raw = "<think>They want JSON {not this}</think>\nSure!\n```json\n{\"dialogue\": \"Ready.\"}\n```\nAnything else?";
        let parsed: Line = parse_record(raw).unwrap();
        assert_eq!(parsed.dialogue, "Ready.");
    }

    #[test]
    fn extracts_final_channel_content() {
        let raw = "<|channel|>analysis<|message|>thinking...<|end|><|start|>assistant<|channel|>final<|message|>{\"dialogue\": \"Go.\"}";
        let parsed: Line = parse_record(raw).unwrap();
        assert_eq!(parsed.dialogue, "Go.");
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_object() {
        let text = r#"prefix {"dialogue": "a } inside \" quotes {"} trailing }"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"dialogue": "a } inside \" quotes {"}"#)
        );
    }

    #[test]
    fn reports_why_parsing_failed() {
        assert_eq!(parse_record::<Line>("   ").unwrap_err(), OracleParseError::Empty);
        assert_eq!(
            parse_record::<Line>("I would rather not.").unwrap_err(),
            OracleParseError::NoJsonObject
        );
        assert!(matches!(
            parse_record::<Line>(r#"{"speech": "wrong key"}"#).unwrap_err(),
            OracleParseError::Shape(_)
        ));
        assert_eq!(
            parse_record::<Line>(r#"{"dialogue": "unterminated"#).unwrap_err(),
            OracleParseError::NoJsonObject
        );
    }
}
