//! Function calls requested by a model.
//!
//! A model may answer with `{"status": "function", "functions": [...]}`
//! instead of a reply. Each entry becomes a [`FunctionCall`], is run by a
//! [`FunctionExecutor`], and the [`FunctionResult`]s are fed back to the
//! model as a synthetic turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single function requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as a JSON object.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl FunctionCall {
    /// Create a call with arguments.
    pub fn new(name: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Get a string argument by name.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument, or return an error message.
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Get an integer argument; numeric strings are accepted.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        match self.params.get(key)? {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Outcome of a function call, reported back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    /// Function name this result belongs to.
    pub name: String,
    /// Result content.
    pub content: String,
    /// Whether the call succeeded.
    pub success: bool,
}

impl FunctionResult {
    /// Create a successful result.
    pub fn success(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            success: true,
        }
    }

    /// Create a failed result.
    pub fn error(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: format!("Error: {}", error.into()),
            success: false,
        }
    }
}

/// Format results as the synthetic turn appended to the conversation.
pub fn format_results(results: &[FunctionResult]) -> String {
    let entries: Vec<Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "function": r.name,
                "success": r.success,
                "result": r.content,
            })
        })
        .collect();
    format!(
        "Function results:\n{}",
        Value::Array(entries)
    )
}

/// Runs functions requested by a model.
#[async_trait]
pub trait FunctionExecutor: Send + Sync {
    /// Execute a call made while answering `channel_id`.
    async fn execute(&self, call: &FunctionCall, channel_id: &str) -> FunctionResult;

    /// Names this executor understands.
    fn supported_functions(&self) -> Vec<&str>;
}
