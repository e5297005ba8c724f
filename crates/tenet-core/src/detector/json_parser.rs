//! JSON parsing utilities for detector responses.
//!
//! Models do not always return clean JSON: output may be fenced, prefixed by
//! reasoning, or cut off by the token limit. Parsing is lenient about shape
//! and falls back to field-level extraction on truncated output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{TenetError, TenetResult};
use crate::types::{BatchContradictionResult, ContradictionCheckResult, ExistingItemForCheck};

/// Confidence assumed when the model flags a result but omits a number.
const DEFAULT_CONFIDENCE: f32 = 0.5;

const MISSING_EXPLANATION: &str = "Analysis unavailable";
const PARTIAL_EXPLANATION: &str = "Partial analysis";
const NOT_ANALYZED: &str = "Item not analyzed";

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[a-zA-Z0-9]*\n?([\s\S]*?)\n?```$").expect("valid regex"));
static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
static OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));
static ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").expect("valid regex"));
static IS_CONTRADICTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"is_?contradiction"\s*:\s*(true|false)"#).expect("valid regex")
});
static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""confidence"\s*:\s*([\d.]+)"#).expect("valid regex"));
static EXPLANATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"explanation"\s*:\s*"([^"]*)"#).expect("valid regex"));

/// Remove code fences and thinking tags from a response.
pub fn remove_code_blocks(content: &str) -> String {
    let content = content.trim();

    let content = CODE_BLOCK_RE
        .captures(content)
        .and_then(|c| c.get(1).map(|m| m.as_str().trim()))
        .unwrap_or(content);

    THINK_RE.replace_all(content, "").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    #[serde(rename = "isContradiction", alias = "is_contradiction", default)]
    is_contradiction: Value,
    #[serde(default)]
    confidence: Value,
    #[serde(alias = "reason", default)]
    explanation: Value,
}

#[derive(Debug, Deserialize)]
struct RawBatchEntry {
    #[serde(rename = "itemId", alias = "item_id", alias = "id")]
    item_id: String,
    #[serde(rename = "isContradiction", alias = "is_contradiction", default)]
    is_contradiction: Value,
    #[serde(default)]
    confidence: Value,
    #[serde(alias = "reason", default)]
    explanation: Value,
}

impl RawBatchEntry {
    fn into_check(self) -> RawCheck {
        RawCheck {
            is_contradiction: self.is_contradiction,
            confidence: self.confidence,
            explanation: self.explanation,
        }
    }
}

impl RawCheck {
    fn into_result(self) -> ContradictionCheckResult {
        let confidence = self
            .confidence
            .as_f64()
            .map(|c| c as f32)
            .unwrap_or(DEFAULT_CONFIDENCE);
        let explanation = self
            .explanation
            .as_str()
            .unwrap_or(MISSING_EXPLANATION)
            .to_string();
        ContradictionCheckResult::new(truthy(&self.is_contradiction), confidence, explanation)
    }
}

/// Loose boolean reading of a JSON value.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn capture_confidence(re: &Regex, text: &str) -> f32 {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .unwrap_or(DEFAULT_CONFIDENCE)
}

/// Parse a single-comparison response.
pub fn parse_check_result(response: &str) -> TenetResult<ContradictionCheckResult> {
    let cleaned = remove_code_blocks(response);

    if let Some(json) = OBJECT_RE.find(&cleaned) {
        if let Ok(raw) = serde_json::from_str::<RawCheck>(json.as_str()) {
            return Ok(raw.into_result());
        }
    }

    // Truncated output: pull individual fields
    let Some(flag) = IS_CONTRADICTION_RE.captures(&cleaned).and_then(|c| c.get(1)) else {
        return Err(TenetError::parse(format!(
            "No contradiction verdict in detector response: {}",
            preview(&cleaned)
        )));
    };
    let is_contradiction = flag.as_str().eq_ignore_ascii_case("true");
    let confidence = capture_confidence(&CONFIDENCE_RE, &cleaned);
    let explanation = EXPLANATION_RE
        .captures(&cleaned)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| PARTIAL_EXPLANATION.to_string());

    tracing::debug!(is_contradiction, confidence, "Extracted partial verdict from truncated response");
    Ok(ContradictionCheckResult::new(is_contradiction, confidence, explanation))
}

/// Parse a batched response into one result per existing item, in input order.
///
/// Items the model did not mention get a zero-confidence "not analyzed"
/// result. Fails only when nothing at all can be read from the response.
pub fn parse_batch_results(
    response: &str,
    existing: &[ExistingItemForCheck],
) -> TenetResult<Vec<BatchContradictionResult>> {
    let cleaned = remove_code_blocks(response);

    if let Some(json) = ARRAY_RE.find(&cleaned) {
        if let Ok(entries) = serde_json::from_str::<Vec<RawBatchEntry>>(json.as_str()) {
            let mut entries: Vec<Option<RawBatchEntry>> = entries.into_iter().map(Some).collect();
            let results = existing
                .iter()
                .map(|item| {
                    let found = entries
                        .iter_mut()
                        .find(|e| matches!(e, Some(entry) if entry.item_id == item.id))
                        .and_then(Option::take);
                    let result = match found {
                        Some(entry) => entry.into_check().into_result(),
                        None => ContradictionCheckResult::not_analyzed(NOT_ANALYZED),
                    };
                    BatchContradictionResult::new(item.id.clone(), result)
                })
                .collect();
            return Ok(results);
        }
    }

    // Truncated array: look for each item's verdict individually
    let mut matched = 0usize;
    let results: Vec<BatchContradictionResult> = existing
        .iter()
        .map(|item| {
            let result = match partial_item_verdict(&cleaned, &item.id) {
                Some(result) => {
                    matched += 1;
                    result
                }
                None => ContradictionCheckResult::not_analyzed(NOT_ANALYZED),
            };
            BatchContradictionResult::new(item.id.clone(), result)
        })
        .collect();

    if matched == 0 {
        return Err(TenetError::parse(format!(
            "No item verdicts in batched detector response: {}",
            preview(&cleaned)
        )));
    }

    tracing::debug!(matched, total = existing.len(), "Extracted partial batch verdicts");
    Ok(results)
}

fn partial_item_verdict(text: &str, item_id: &str) -> Option<ContradictionCheckResult> {
    let id = regex::escape(item_id);
    let verdict_re = Regex::new(&format!(
        r#"(?i)"item_?id"\s*:\s*"{}"[^}}]*"is_?contradiction"\s*:\s*(true|false)"#,
        id
    ))
    .ok()?;
    let flag = verdict_re.captures(text)?.get(1)?;

    let confidence = Regex::new(&format!(
        r#"(?i)"item_?id"\s*:\s*"{}"[^}}]*"confidence"\s*:\s*([\d.]+)"#,
        id
    ))
    .map(|re| capture_confidence(&re, text))
    .unwrap_or(DEFAULT_CONFIDENCE);

    Some(ContradictionCheckResult::new(
        flag.as_str().eq_ignore_ascii_case("true"),
        confidence,
        PARTIAL_EXPLANATION,
    ))
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[&str]) -> Vec<ExistingItemForCheck> {
        ids.iter()
            .map(|id| ExistingItemForCheck {
                id: id.to_string(),
                content: format!("content {}", id),
                title: None,
            })
            .collect()
    }

    #[test]
    fn test_remove_code_blocks() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(remove_code_blocks(input), r#"{"key": "value"}"#);

        let input = "<think>\nhmm\n</think>{\"a\": 1}";
        assert_eq!(remove_code_blocks(input), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_clean_check() {
        let result = parse_check_result(
            r#"{"isContradiction": true, "confidence": 0.92, "explanation": "status changed"}"#,
        )
        .unwrap();
        assert!(result.is_contradiction);
        assert!((result.confidence - 0.92).abs() < 1e-6);
        assert_eq!(result.explanation, "status changed");
    }

    #[test]
    fn test_parse_check_with_prose_and_snake_case() {
        let result = parse_check_result(
            "Sure, here it is:\n{\"is_contradiction\": \"true\", \"confidence\": 1.5, \"reason\": \"moved\"}",
        )
        .unwrap();
        assert!(result.is_contradiction);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.explanation, "moved");
    }

    #[test]
    fn test_parse_check_missing_fields_use_defaults() {
        let result = parse_check_result(r#"{"isContradiction": true}"#).unwrap();
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.explanation, MISSING_EXPLANATION);
    }

    #[test]
    fn test_parse_truncated_check() {
        let result =
            parse_check_result(r#"{"isContradiction": true, "confidence": 0.85, "explanation": "The user no lon"#)
                .unwrap();
        assert!(result.is_contradiction);
        assert!((result.confidence - 0.85).abs() < 1e-6);
        assert_eq!(result.explanation, "The user no lon");
    }

    #[test]
    fn test_parse_garbage_check_fails() {
        assert!(parse_check_result("I cannot decide.").is_err());
    }

    #[test]
    fn test_parse_batch_maps_by_id_in_input_order() {
        let response = r#"```json
[
  {"itemId": "b", "isContradiction": false, "confidence": 0.9, "explanation": "unrelated"},
  {"itemId": "a", "isContradiction": true, "confidence": 0.8, "explanation": "replaced"}
]
```"#;
        let results = parse_batch_results(response, &items(&["a", "b", "c"])).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].item_id, "a");
        assert!(results[0].result.is_contradiction);
        assert_eq!(results[1].item_id, "b");
        assert!(!results[1].result.is_contradiction);
        // Omitted by the model
        assert_eq!(results[2].item_id, "c");
        assert_eq!(results[2].result.confidence, 0.0);
        assert_eq!(results[2].result.explanation, NOT_ANALYZED);
    }

    #[test]
    fn test_parse_truncated_batch() {
        let response = r#"[{"itemId": "a.1", "isContradiction": true, "confidence": 0.95, "explanation": "x"}, {"itemId": "b", "isContra"#;
        let results = parse_batch_results(response, &items(&["a.1", "b"])).unwrap();
        assert!(results[0].result.is_contradiction);
        assert!((results[0].result.confidence - 0.95).abs() < 1e-6);
        assert_eq!(results[0].result.explanation, PARTIAL_EXPLANATION);
        assert!(!results[1].result.is_contradiction);
        assert_eq!(results[1].result.explanation, NOT_ANALYZED);
    }

    #[test]
    fn test_parse_batch_garbage_fails() {
        assert!(parse_batch_results("no idea", &items(&["a"])).is_err());
    }
}
