//! Error types for adapter and memory operations.

use thiserror::Error;

/// Errors that can occur while talking to a backend or a memory store.
#[derive(Debug, Clone, Error)]
pub enum BrainError {
    /// Invalid configuration (unknown backend kind, bad option). Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The backend answered, but not in the shape its protocol expects.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A memory store operation failed.
    #[error("memory error: {0}")]
    Memory(String),
}

impl BrainError {
    /// Whether this error should make the caller move on to the next backend.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Api { .. } | Self::InvalidResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(BrainError::Network("reset".into()).is_transport());
        assert!(BrainError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transport());
        assert!(BrainError::InvalidResponse("no choices".into()).is_transport());
        assert!(!BrainError::Configuration("unknown kind".into()).is_transport());
        assert!(!BrainError::Memory("full".into()).is_transport());
    }

    #[test]
    fn test_api_error_display() {
        let err = BrainError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "API error (429): rate limited");
    }
}
