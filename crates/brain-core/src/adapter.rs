//! The backend adapter contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BrainError;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The people in the chat (or a synthetic result turn).
    User,
    /// The model.
    Assistant,
}

impl Role {
    /// Wire name used by OpenAI-shaped APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn sent to a backend after the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who is speaking.
    pub role: Role,
    /// Turn text, possibly containing inline image markers.
    pub content: String,
}

impl Turn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    pub completion_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt and completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Add two optional usages; `None` only when both are `None`.
    pub fn merge(a: Option<Usage>, b: Option<Usage>) -> Option<Usage> {
        match (a, b) {
            (None, None) => None,
            (Some(u), None) | (None, Some(u)) => Some(u),
            (Some(a), Some(b)) => Some(Usage {
                prompt_tokens: a.prompt_tokens.saturating_add(b.prompt_tokens),
                completion_tokens: a.completion_tokens.saturating_add(b.completion_tokens),
                total_tokens: a.total_tokens.saturating_add(b.total_tokens),
            }),
        }
    }
}

/// Normalized backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterReply {
    /// Raw model output. Usually a string; some backends return structures.
    pub content: Value,
    /// Token accounting, when the backend provides it.
    pub usage: Option<Usage>,
}

impl AdapterReply {
    /// Create a reply from text.
    pub fn text(content: impl Into<String>, usage: Option<Usage>) -> Self {
        Self {
            content: Value::String(content.into()),
            usage,
        }
    }

    /// The content as text; structures are serialized.
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// A language-model backend.
///
/// Implementations translate the shared request shape into one vendor's
/// wire protocol and normalize the answer back into an [`AdapterReply`].
/// The trait is object-safe and used as `Arc<dyn Adapter>`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Send a system prompt and conversation turns, return the model output.
    async fn call(&self, system_prompt: &str, turns: &[Turn]) -> Result<AdapterReply, BrainError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_merge() {
        let a = Some(Usage::new(10, 5));
        let b = Some(Usage::new(1, 2));
        assert_eq!(Usage::merge(a, b), Some(Usage::new(11, 7)));
        assert_eq!(Usage::merge(None, b), b);
        assert_eq!(Usage::merge(None, None), None);
    }

    #[test]
    fn test_content_text_serializes_structures() {
        let reply = AdapterReply {
            content: serde_json::json!({"status": "skip"}),
            usage: None,
        };
        assert_eq!(reply.content_text(), r#"{"status":"skip"}"#);
        assert_eq!(AdapterReply::text("hi", None).content_text(), "hi");
    }
}
