//! Echo adapter - replies with the last user turn.

use async_trait::async_trait;
use brain_core::{Adapter, AdapterReply, BrainError, Role, Turn};
use serde_json::json;

/// An adapter that echoes the last user turn back.
///
/// By default the echo is wrapped in a `success` reply object so it flows
/// through the interpreter; [`EchoAdapter::raw`] returns the turn verbatim.
#[derive(Debug, Clone, Default)]
pub struct EchoAdapter {
    /// Optional prefix to add before the echo.
    prefix: Option<String>,
    raw: bool,
}

impl EchoAdapter {
    /// Create a new EchoAdapter with no prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new EchoAdapter with a custom prefix.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mock_brain::EchoAdapter;
    ///
    /// let adapter = EchoAdapter::with_prefix("Echo: ");
    /// // Will reply with "Echo: <last user turn>"
    /// ```
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            raw: false,
        }
    }

    /// Return the last user turn without wrapping it in a reply object.
    pub fn raw() -> Self {
        Self {
            prefix: None,
            raw: true,
        }
    }
}

#[async_trait]
impl Adapter for EchoAdapter {
    async fn call(&self, _system_prompt: &str, turns: &[Turn]) -> Result<AdapterReply, BrainError> {
        let last = turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.as_str())
            .unwrap_or_default();

        let text = match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, last),
            None => last.to_string(),
        };

        if self.raw {
            return Ok(AdapterReply::text(text, None));
        }
        let body = json!({"status": "success", "finalReply": text});
        Ok(AdapterReply::text(body.to_string(), None))
    }

    fn name(&self) -> &str {
        "EchoAdapter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_echo_wraps_last_user_turn() {
        let adapter = EchoAdapter::new();
        let turns = vec![Turn::user("first"), Turn::assistant("ok"), Turn::user("Hello!")];

        let reply = adapter.call("sys", &turns).await.unwrap();
        let parsed: Value = serde_json::from_str(&reply.content_text()).unwrap();
        assert_eq!(parsed["status"], "success");
        assert_eq!(parsed["finalReply"], "Hello!");
        assert!(reply.usage.is_none());
    }

    #[tokio::test]
    async fn test_echo_with_prefix() {
        let adapter = EchoAdapter::with_prefix("Echo: ");
        let reply = adapter.call("", &[Turn::user("Hello!")]).await.unwrap();
        let parsed: Value = serde_json::from_str(&reply.content_text()).unwrap();
        assert_eq!(parsed["finalReply"], "Echo: Hello!");
    }

    #[tokio::test]
    async fn test_raw_echo() {
        let adapter = EchoAdapter::raw();
        let reply = adapter.call("", &[Turn::user("not json")]).await.unwrap();
        assert_eq!(reply.content_text(), "not json");
    }

    #[tokio::test]
    async fn test_adapter_name() {
        assert_eq!(EchoAdapter::new().name(), "EchoAdapter");
    }
}
