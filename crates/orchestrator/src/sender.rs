//! Delivery sink trait and implementations.

use async_trait::async_trait;
use brain_core::Segment;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::actions::Action;
use crate::error::OrchestratorError;

/// Where planned actions go.
///
/// Abstracted to support different hosts (chat platforms, consoles, tests).
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Send rendered markup to a channel.
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), OrchestratorError>;

    /// Send rendered markup as a reply to an earlier message.
    ///
    /// Default implementation prefixes the quote element and calls `send`.
    async fn send_quoted(
        &self,
        channel_id: &str,
        text: &str,
        quote_id: &str,
    ) -> Result<(), OrchestratorError> {
        let quote = Segment::Quote {
            id: quote_id.to_string(),
        };
        self.send(channel_id, &format!("{quote}{text}")).await
    }

    /// Run a host command in a channel.
    async fn execute(&self, channel_id: &str, command: &str) -> Result<(), OrchestratorError>;
}

/// Deliver actions in order. A failed action is logged and the rest still run.
///
/// Returns how many actions were delivered.
pub async fn dispatch<S: DeliverySink + ?Sized>(sink: &S, actions: &[Action]) -> usize {
    let mut delivered = 0;
    for action in actions {
        let result = match action {
            Action::Send { channel_id, text } => sink.send(channel_id, text).await,
            Action::SendQuoted {
                channel_id,
                text,
                quote_id,
            } => sink.send_quoted(channel_id, text, quote_id).await,
            Action::Execute {
                channel_id,
                command,
            } => sink.execute(channel_id, command).await,
        };
        match result {
            Ok(()) => delivered += 1,
            Err(e) => warn!(action = %action.description(), error = %e, "DISPATCH_FAILED"),
        }
    }
    delivered
}

/// A sink for testing that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoOpSink;

#[async_trait]
impl DeliverySink for NoOpSink {
    async fn send(&self, _channel_id: &str, _text: &str) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn execute(&self, _channel_id: &str, _command: &str) -> Result<(), OrchestratorError> {
        Ok(())
    }
}

/// A sink for debugging that logs every action.
#[derive(Debug, Clone, Default)]
pub struct LoggingSink;

#[async_trait]
impl DeliverySink for LoggingSink {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), OrchestratorError> {
        info!(channel = %channel_id, "send: {}", text);
        Ok(())
    }

    async fn send_quoted(
        &self,
        channel_id: &str,
        text: &str,
        quote_id: &str,
    ) -> Result<(), OrchestratorError> {
        info!(channel = %channel_id, quote = %quote_id, "reply: {}", text);
        Ok(())
    }

    async fn execute(&self, channel_id: &str, command: &str) -> Result<(), OrchestratorError> {
        info!(channel = %channel_id, "execute: {}", command);
        Ok(())
    }
}

/// A sink that records delivered actions, optionally failing some commands.
#[derive(Debug, Default)]
pub struct RecordingSink {
    actions: Mutex<Vec<Action>>,
    failing_commands: Vec<String>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `execute` fail for this command.
    pub fn fail_on(mut self, command: impl Into<String>) -> Self {
        self.failing_commands.push(command.into());
        self
    }

    /// Actions delivered so far.
    pub async fn actions(&self) -> Vec<Action> {
        self.actions.lock().await.clone()
    }

    /// Text sent to a channel, in order, quotes included.
    pub async fn sent_to(&self, channel: &str) -> Vec<String> {
        self.actions
            .lock()
            .await
            .iter()
            .filter_map(|a| match a {
                Action::Send { channel_id, text } | Action::SendQuoted { channel_id, text, .. }
                    if channel_id == channel =>
                {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), OrchestratorError> {
        self.actions.lock().await.push(Action::Send {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_quoted(
        &self,
        channel_id: &str,
        text: &str,
        quote_id: &str,
    ) -> Result<(), OrchestratorError> {
        self.actions.lock().await.push(Action::SendQuoted {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
            quote_id: quote_id.to_string(),
        });
        Ok(())
    }

    async fn execute(&self, channel_id: &str, command: &str) -> Result<(), OrchestratorError> {
        if self.failing_commands.iter().any(|c| c == command) {
            return Err(OrchestratorError::SendFailed(format!(
                "command `{command}` rejected"
            )));
        }
        self.actions.lock().await.push(Action::Execute {
            channel_id: channel_id.to_string(),
            command: command.to_string(),
        });
        Ok(())
    }
}
