//! Passthrough parameter decoding.

use serde_json::{Map, Number, Value};

use crate::config::PassthroughParam;

/// Decode a configured parameter value.
///
/// Tried in order: JSON object or array, boolean literal, number, and
/// finally the raw string.
pub fn decode_param_value(raw: &str) -> Value {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }

    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

/// Decode all passthrough parameters into a JSON map.
///
/// Later duplicates override earlier ones.
pub fn decode_params(params: &[PassthroughParam]) -> Map<String, Value> {
    params
        .iter()
        .filter(|p| !p.key.trim().is_empty())
        .map(|p| (p.key.trim().to_string(), decode_param_value(&p.value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_order() {
        assert_eq!(decode_param_value(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(decode_param_value("[1, 2]"), json!([1, 2]));
        assert_eq!(decode_param_value("true"), json!(true));
        assert_eq!(decode_param_value(" false "), json!(false));
        assert_eq!(decode_param_value("42"), json!(42));
        assert_eq!(decode_param_value("0.25"), json!(0.25));
        assert_eq!(decode_param_value("hello"), json!("hello"));
    }

    #[test]
    fn test_broken_json_falls_back_to_string() {
        assert_eq!(decode_param_value("{not json"), json!("{not json"));
        assert_eq!(decode_param_value("True"), json!("True"));
        assert_eq!(decode_param_value("NaN"), json!("NaN"));
    }

    #[test]
    fn test_decode_params_skips_blank_keys() {
        let params = vec![
            PassthroughParam {
                key: "seed".into(),
                value: "7".into(),
            },
            PassthroughParam {
                key: " ".into(),
                value: "x".into(),
            },
            PassthroughParam {
                key: "seed".into(),
                value: "8".into(),
            },
        ];
        let map = decode_params(&params);
        assert_eq!(map.len(), 1);
        assert_eq!(map["seed"], json!(8));
    }
}
