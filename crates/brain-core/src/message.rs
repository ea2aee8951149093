//! Chat message types shared by the queue, the scheduler and the interpreter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix the host uses for private (direct) channel ids.
pub const PRIVATE_CHANNEL_PREFIX: &str = "private:";

/// Classification tag that keeps a message from being reprocessed.
///
/// A message starts as `Unknown` and only ever moves away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    /// Freshly ingested, not yet classified.
    #[default]
    Unknown,
    /// Accepted into a channel window.
    Added,
    /// Administrative or bot command traffic.
    Command,
    /// Re-routed by the host's own logic.
    LogicRedirect,
    /// Emitted by the bot itself.
    Llm,
}

impl Mark {
    /// Parse a mark name as written in configuration.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unknown" => Some(Self::Unknown),
            "added" => Some(Self::Added),
            "command" => Some(Self::Command),
            "logic_redirect" | "logicredirect" => Some(Self::LogicRedirect),
            "llm" => Some(Self::Llm),
            _ => None,
        }
    }
}

/// Attempted to move a message back to [`Mark::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mark transition {from:?} -> {to:?} is not allowed")]
pub struct MarkTransitionError {
    /// Mark before the rejected transition.
    pub from: Mark,
    /// Requested mark.
    pub to: Mark,
}

/// Whether a channel is a group conversation or a private one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Multi-member channel.
    Group,
    /// One-to-one conversation with the bot.
    Private,
}

impl ChannelKind {
    /// Derive the kind from a channel id.
    pub fn of(channel_id: &str) -> Self {
        if channel_id.starts_with(PRIVATE_CHANNEL_PREFIX) {
            Self::Private
        } else {
            Self::Group
        }
    }
}

/// A message as delivered by the host framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundChat {
    /// Channel the message arrived on.
    pub channel_id: String,
    /// Sender identifier.
    pub sender_id: String,
    /// Sender display name, when the host knows it.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Message content (host markup allowed).
    pub content: String,
    /// Host message id.
    pub message_id: String,
    /// Timestamp in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// A message tracked by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Host message id.
    pub id: String,
    /// Channel the message belongs to.
    pub channel_id: String,
    /// Sender identifier.
    pub sender_id: String,
    /// Sender display name, falls back to the sender id.
    pub sender_name: String,
    /// Message content.
    pub content: String,
    /// Timestamp in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Classification tag.
    pub mark: Mark,
}

impl ChatMessage {
    /// Create an unclassified message.
    pub fn new(
        id: impl Into<String>,
        channel_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        let sender_id = sender_id.into();
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            sender_name: sender_id.clone(),
            sender_id,
            content: content.into(),
            timestamp,
            mark: Mark::Unknown,
        }
    }

    /// Set the sender display name.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    /// Set the initial mark.
    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.mark = mark;
        self
    }

    /// Move to a new mark. Moving back to `Unknown` is rejected.
    pub fn advance(&mut self, to: Mark) -> Result<(), MarkTransitionError> {
        if to == Mark::Unknown && self.mark != Mark::Unknown {
            return Err(MarkTransitionError {
                from: self.mark,
                to,
            });
        }
        self.mark = to;
        Ok(())
    }

    /// Kind of the channel this message belongs to.
    pub fn channel_kind(&self) -> ChannelKind {
        ChannelKind::of(&self.channel_id)
    }
}

impl From<InboundChat> for ChatMessage {
    fn from(inbound: InboundChat) -> Self {
        let sender_name = inbound
            .sender_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| inbound.sender_id.clone());
        Self {
            id: inbound.message_id,
            channel_id: inbound.channel_id,
            sender_id: inbound.sender_id,
            sender_name,
            content: inbound.content,
            timestamp: inbound.timestamp,
            mark: Mark::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_never_reverts_to_unknown() {
        let mut msg = ChatMessage::new("1", "group-a", "alice", "hi", 10);
        msg.advance(Mark::Added).unwrap();
        msg.advance(Mark::Llm).unwrap();

        let err = msg.advance(Mark::Unknown).unwrap_err();
        assert_eq!(err.from, Mark::Llm);
        assert_eq!(msg.mark, Mark::Llm);
    }

    #[test]
    fn test_channel_kind() {
        assert_eq!(ChannelKind::of("private:42"), ChannelKind::Private);
        assert_eq!(ChannelKind::of("10086"), ChannelKind::Group);
    }

    #[test]
    fn test_from_inbound_uses_sender_id_when_name_missing() {
        let msg = ChatMessage::from(InboundChat {
            channel_id: "group-a".into(),
            sender_id: "alice".into(),
            sender_name: Some("  ".into()),
            content: "hello".into(),
            message_id: "m1".into(),
            timestamp: 5,
        });
        assert_eq!(msg.sender_name, "alice");
        assert_eq!(msg.mark, Mark::Unknown);
    }

    #[test]
    fn test_mark_parse() {
        assert_eq!(Mark::parse("LLM"), Some(Mark::Llm));
        assert_eq!(Mark::parse("logic_redirect"), Some(Mark::LogicRedirect));
        assert_eq!(Mark::parse("nope"), None);
    }
}
