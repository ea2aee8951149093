//! Field accessors over the parsed response object.
//!
//! Reply text is found through an ordered accessor list so new aliases are a
//! one-line change. Numeric fields are coerced strictly: a number, or a
//! string holding an integer. Anything else is an error, never a silent
//! default.

use brain_core::FunctionCall;
use serde_json::{Map, Value};

use crate::config::ReplyMode;
use crate::error::InterpretError;

/// Fields checked for reply text in lenient mode, in priority order.
pub const REPLY_ACCESSORS: &[&str] = &[
    "finalReply",
    "reply",
    "msg",
    "message",
    "text",
    "content",
    "answer",
];

/// The only reply field accepted in strict mode.
pub const STRICT_REPLY_FIELD: &str = "finalReply";

/// Quote reference meaning "quote nothing".
pub const QUOTE_NONE: i64 = -1;

/// Fields naming the message to quote, in priority order.
const QUOTE_FIELDS: &[&str] = &["select", "quote"];

/// A parsed response object.
pub type Object = Map<String, Value>;

/// The lowercased `status` field.
pub fn status(obj: &Object) -> Result<String, InterpretError> {
    obj.get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .ok_or(InterpretError::MissingField("status"))
}

/// Reply text under the given mode, `None` if nothing usable is present.
pub fn reply_text(obj: &Object, mode: ReplyMode) -> Option<String> {
    match mode {
        ReplyMode::Strict => obj.get(STRICT_REPLY_FIELD).and_then(text_of),
        ReplyMode::Lenient => REPLY_ACCESSORS
            .iter()
            .find_map(|field| obj.get(*field).and_then(text_of)),
    }
}

fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    (!text.trim().is_empty()).then_some(text)
}

/// Strict integer coercion. Absent, null and blank strings are `None`.
pub fn coerce_int(obj: &Object, field: &'static str) -> Result<Option<i64>, InterpretError> {
    let Some(value) = obj.get(field) else {
        return Ok(None);
    };
    let coerced = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };
    coerced.map(Some).ok_or_else(|| InterpretError::NumberCoercion {
        field,
        value: value.to_string(),
    })
}

/// A finite float with no fractional part, within `i64` range.
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// The quoted message id, if one was selected.
pub fn quote(obj: &Object) -> Result<Option<String>, InterpretError> {
    for &field in QUOTE_FIELDS {
        if let Some(n) = coerce_int(obj, field)? {
            return Ok((n != QUOTE_NONE).then(|| n.to_string()));
        }
    }
    Ok(None)
}

/// The `replyTo` channel. Numbers are accepted and rendered as ids.
pub fn address(obj: &Object) -> Result<Option<String>, InterpretError> {
    match obj.get("replyTo") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(Value::String(_)) | Some(Value::Null) | None => Ok(None),
        Some(_) => Ok(coerce_int(obj, "replyTo")?.map(|n| n.to_string())),
    }
}

/// The model's reasoning, carried for diagnostics.
pub fn logic(obj: &Object) -> Option<String> {
    match obj.get("logic")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Commands from `execute`, a string or an array of strings.
pub fn commands(obj: &Object) -> Vec<String> {
    let owned = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    match obj.get("execute") {
        Some(Value::String(s)) => owned(s.as_str()).into_iter().collect(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).filter_map(owned).collect(),
        _ => Vec::new(),
    }
}

/// Calls from `functions` (array) or `function` (single object).
pub fn function_calls(obj: &Object) -> Result<Vec<FunctionCall>, InterpretError> {
    let raw: Vec<&Value> = match (obj.get("functions"), obj.get("function")) {
        (Some(Value::Array(items)), _) => items.iter().collect(),
        (Some(single @ Value::Object(_)), _) | (None, Some(single @ Value::Object(_))) => vec![single],
        (None, Some(Value::Array(items))) => items.iter().collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|v| {
            serde_json::from_value::<FunctionCall>(v.clone())
                .map_err(|e| InterpretError::Malformed(format!("bad function call: {e}")))
        })
        .collect()
}
