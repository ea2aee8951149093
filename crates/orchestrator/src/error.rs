//! Error types for orchestrator operations.

use brain_core::BrainError;
use chat_queue::QueueError;
use thiserror::Error;

/// Errors that can occur while running a turn.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid configuration. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backend failed with a non-transport error.
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),

    /// Every roster entry failed with a transport error.
    #[error("all {attempts} adapters failed{}", last_error_suffix(.last))]
    AdaptersExhausted {
        /// Adapters tried.
        attempts: usize,
        /// Error from the final attempt.
        last: Option<BrainError>,
    },

    /// Message sending failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The message queue failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

fn last_error_suffix(last: &Option<BrainError>) -> String {
    last.as_ref()
        .map(|e| format!(", last error: {e}"))
        .unwrap_or_default()
}

/// Why model output could not be turned into a reply.
///
/// Every variant becomes an `InterpretedResponse::Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    /// No `{ ... }` span in the output.
    #[error("no JSON found")]
    NoJson,

    /// The span did not parse, even leniently.
    #[error("malformed JSON: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// `status` is not one of `success`, `skip` or `function`.
    #[error("unknown status: {0}")]
    UnknownStatus(String),

    /// Lenient scan found no reply text and no function call.
    #[error("no reply text found")]
    NoReply,

    /// A numeric field held something that is not a number.
    #[error("field `{field}` is not a number: {value}")]
    NumberCoercion {
        /// Field name.
        field: &'static str,
        /// Offending value as JSON.
        value: String,
    },

    /// The function-call loop hit its depth limit.
    #[error("function call depth {0} exceeded")]
    DepthExceeded(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let err = OrchestratorError::AdaptersExhausted {
            attempts: 2,
            last: Some(BrainError::Network("timeout".into())),
        };
        assert_eq!(
            err.to_string(),
            "all 2 adapters failed, last error: network error: timeout"
        );

        let err = OrchestratorError::AdaptersExhausted {
            attempts: 0,
            last: None,
        };
        assert_eq!(err.to_string(), "all 0 adapters failed");
    }

    #[test]
    fn test_interpret_error_messages() {
        assert_eq!(InterpretError::NoJson.to_string(), "no JSON found");
        assert_eq!(
            InterpretError::NumberCoercion {
                field: "select",
                value: "\"abc\"".into()
            }
            .to_string(),
            "field `select` is not a number: \"abc\""
        );
    }
}
