//! Locating and parsing the JSON object in raw model output.

use serde_json::Value;

use crate::error::InterpretError;

/// The span from the first `{` to the last `}`, inclusive.
pub fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse a span as JSON, falling back to JSON5 for trailing commas,
/// unquoted keys and single-quoted strings.
pub fn parse_lenient(span: &str) -> Result<Value, InterpretError> {
    serde_json::from_str(span)
        .or_else(|_| json5::from_str::<Value>(span))
        .map_err(|e| InterpretError::Malformed(e.to_string()))
}
