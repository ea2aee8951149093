//! [`Adapter`] implementation over a protocol and a transport.

use std::sync::Arc;

use brain_core::{async_trait, Adapter, AdapterReply, BrainError, Turn};
use tracing::{debug, info, warn};

use crate::config::AdapterEntry;
use crate::protocol::{protocol_for, Protocol};
use crate::transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};

/// A backend adapter built from one roster entry.
pub struct LlmAdapter {
    entry: AdapterEntry,
    name: String,
    protocol: Box<dyn Protocol>,
    transport: Arc<dyn Transport>,
}

impl LlmAdapter {
    /// Create an adapter that sends through the given transport.
    pub fn new(entry: AdapterEntry, transport: Arc<dyn Transport>) -> Result<Self, BrainError> {
        entry.validate()?;
        let name = entry.label();
        info!(
            adapter = %name,
            multimodal = entry.multimodal,
            "adapter initialized"
        );
        Ok(Self {
            protocol: protocol_for(entry.kind),
            entry,
            name,
            transport,
        })
    }

    /// Create an adapter with its own HTTP transport.
    pub fn from_entry(entry: AdapterEntry) -> Result<Self, BrainError> {
        let transport = Arc::new(HttpTransport::new(DEFAULT_TIMEOUT)?);
        Self::new(entry, transport)
    }

    /// The entry this adapter was built from.
    pub fn entry(&self) -> &AdapterEntry {
        &self.entry
    }
}

#[async_trait]
impl Adapter for LlmAdapter {
    async fn call(&self, system_prompt: &str, turns: &[Turn]) -> Result<AdapterReply, BrainError> {
        let request = self
            .protocol
            .build_request(&self.entry, system_prompt, turns)?;
        debug!(adapter = %self.name, turns = turns.len(), "sending adapter request");

        let body = self.transport.post_json(&request).await.map_err(|e| {
            warn!(adapter = %self.name, error = %e, "adapter request failed");
            e
        })?;
        let reply = self.protocol.normalize(body)?;

        if let Some(usage) = reply.usage {
            debug!(
                adapter = %self.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "adapter usage"
            );
        }
        Ok(reply)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterKind;
    use crate::protocol::HttpRequest;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    /// Returns a canned body and records what was sent.
    struct CannedTransport {
        response: Result<Value, BrainError>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedTransport {
        fn new(response: Result<Value, BrainError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn post_json(&self, request: &HttpRequest) -> Result<Value, BrainError> {
            self.seen.lock().await.push(request.clone());
            self.response.clone()
        }
    }

    fn ollama_entry() -> AdapterEntry {
        AdapterEntry::builder()
            .kind(AdapterKind::Ollama)
            .endpoint("http://localhost:11434")
            .model("llama3")
            .build()
    }

    #[tokio::test]
    async fn test_call_round_trips_through_transport() {
        let transport = CannedTransport::new(Ok(json!({
            "message": {"content": "{\"status\":\"skip\"}"},
            "prompt_eval_count": 3,
            "eval_count": 1
        })));
        let adapter = LlmAdapter::new(ollama_entry(), transport.clone()).unwrap();

        let reply = adapter.call("sys", &[Turn::user("hi")]).await.unwrap();
        assert_eq!(reply.content_text(), r#"{"status":"skip"}"#);
        assert_eq!(reply.usage.map(|u| u.total_tokens), Some(4));
        assert_eq!(adapter.name(), "ollama:llama3");

        let seen = transport.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://localhost:11434/api/chat");
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let transport = CannedTransport::new(Err(BrainError::Api {
            status: 503,
            message: "busy".into(),
        }));
        let adapter = LlmAdapter::new(ollama_entry(), transport).unwrap();
        let err = adapter.call("", &[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, BrainError::Api { status: 503, .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let transport = CannedTransport::new(Ok(json!({"unexpected": true})));
        let adapter = LlmAdapter::new(ollama_entry(), transport).unwrap();
        let err = adapter.call("", &[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, BrainError::InvalidResponse(_)));
    }

    #[test]
    fn test_invalid_entry_is_rejected() {
        let mut entry = ollama_entry();
        entry.endpoint.clear();
        let transport = CannedTransport::new(Ok(Value::Null));
        assert!(matches!(
            LlmAdapter::new(entry, transport),
            Err(BrainError::Configuration(_))
        ));
    }
}
