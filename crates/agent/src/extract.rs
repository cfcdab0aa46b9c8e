//! Turning free-form model replies into typed records.
//!
//! Extraction runs in two phases that are kept as separate functions:
//! [`extract_typed`] attempts a strict parse of the JSON object embedded in the
//! reply, and the heuristic helpers ([`sniff_risk_level`], [`key_value_lines`],
//! [`labeled_value`]) recover what they can from plain text when that fails.

use glowie_core::RiskLevel;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("reply contains no JSON object")]
    NoJsonObject,
    #[error("embedded JSON is invalid: {0}")]
    InvalidJson(String),
    #[error("JSON object does not match the expected shape: {0}")]
    SchemaMismatch(String),
    #[error("reply is missing the `{0}` line")]
    MissingField(&'static str),
    #[error("`{field}` is not a finite number: `{value}`")]
    InvalidNumber { field: &'static str, value: String },
}

/// Greedy match from the first `{` to the last `}` in the reply.
pub fn locate_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// First brace-balanced object starting at the first `{`, honoring string literals.
pub fn balanced_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in reply[start..].char_indices() {
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
                    return Some(&reply[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn parse_json_object(reply: &str) -> Result<Map<String, Value>, ParseError> {
    let greedy = locate_json_object(reply).ok_or(ParseError::NoJsonObject)?;
    let first_error = match serde_json::from_str::<Value>(greedy) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(_) => ParseError::SchemaMismatch("top-level value is not an object".to_string()),
        Err(error) => ParseError::InvalidJson(error.to_string()),
    };

    match balanced_json_object(reply).map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => Ok(map),
        _ => Err(first_error),
    }
}

/// Strict phase: the embedded object must deserialize into `T`. Missing keys
/// take whatever defaults `T` declares.
pub fn extract_typed<T: DeserializeOwned>(reply: &str) -> Result<T, ParseError> {
    let map = parse_json_object(reply)?;
    serde_json::from_value(Value::Object(map))
        .map_err(|error| ParseError::SchemaMismatch(error.to_string()))
}

/// "high" wins over "low"; anything else is medium.
pub fn sniff_risk_level(reply: &str) -> RiskLevel {
    let lowered = reply.to_lowercase();
    if lowered.contains("high") {
        RiskLevel::High
    } else if lowered.contains("low") {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

/// `Key Name: value` lines become `key_name -> "value"`.
pub fn key_value_lines(reply: &str) -> Map<String, Value> {
    reply
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(key, value)| {
            let key = key.trim().to_lowercase().replace(' ', "_");
            (!key.is_empty()).then(|| (key, Value::String(value.trim().to_string())))
        })
        .collect()
}

/// Value of the first line starting with `LABEL:` (after trimming), if any.
pub fn labeled_value<'a>(reply: &'a str, label: &str) -> Option<&'a str> {
    reply.lines().map(str::trim).find_map(|line| {
        line.strip_prefix(label)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
