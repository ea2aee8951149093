//! HTTP transport for adapter requests.

use std::time::Duration;

use async_trait::async_trait;
use brain_core::BrainError;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::api_types::ApiError;
use crate::protocol::HttpRequest;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends a JSON request and returns the JSON body of a success response.
///
/// Errors map onto [`BrainError`]: no response is `Network`, a non-success
/// status is `Api`, and an unreadable body is `InvalidResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST the request.
    async fn post_json(&self, request: &HttpRequest) -> Result<Value, BrainError>;
}

/// [`Transport`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, BrainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrainError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: &HttpRequest) -> Result<Value, BrainError> {
        let mut builder = self
            .client
            .post(&request.url)
            .header("Content-Type", "application/json")
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BrainError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BrainError::Api {
                status: status.as_u16(),
                message: error_message(&error_text),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BrainError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        debug!(status = status.as_u16(), "adapter response received");
        Ok(body)
    }
}

/// Prefer the structured error message when the body carries one.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error": {"message": "rate limited", "type": "rate_limit"}}"#),
            "rate limited"
        );
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let request = HttpRequest {
            url: "http://127.0.0.1:9/unreachable".to_string(),
            headers: Vec::new(),
            body: serde_json::json!({}),
        };
        let result = transport.post_json(&request).await;
        assert!(matches!(result, Err(BrainError::Network(_))));
    }
}
