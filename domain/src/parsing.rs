//! Validation of structured oracle payloads.
//!
//! Oracle output is untrusted: every payload is parsed into a strict raw
//! shape with serde and then checked against the domain's invariants.
//! Failures surface as [`ParseError`], which callers turn into their
//! documented fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Oracle payload did not conform to the expected schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Payload does not match schema: {0}")]
    Shape(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ParseError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Deserialize a JSON value into a raw payload struct.
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, ParseError> {
    T::deserialize(value).map_err(|e| ParseError::Shape(e.to_string()))
}

/// Find the first JSON object embedded in free-form text.
///
/// Models sometimes wrap JSON in prose or code fences; this scans from the
/// first `{` to the last `}` and parses that span.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
