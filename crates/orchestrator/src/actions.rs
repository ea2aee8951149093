//! Delivery actions planned from an interpreted response.

use brain_core::markup::render;
use brain_core::Segment;
use serde::{Deserialize, Serialize};

use crate::interpreter::InterpretedResponse;

/// One thing to hand to the delivery sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Send rendered text.
    Send {
        /// Target channel.
        channel_id: String,
        /// Rendered markup.
        text: String,
    },

    /// Send rendered text as a reply to an earlier message.
    SendQuoted {
        /// Target channel.
        channel_id: String,
        /// Rendered markup, without the quote element.
        text: String,
        /// Quoted message id.
        quote_id: String,
    },

    /// Run a host command.
    Execute {
        /// Channel the command runs in.
        channel_id: String,
        /// Command line.
        command: String,
    },
}

impl Action {
    /// Target channel.
    pub fn channel_id(&self) -> &str {
        match self {
            Self::Send { channel_id, .. }
            | Self::SendQuoted { channel_id, .. }
            | Self::Execute { channel_id, .. } => channel_id,
        }
    }

    /// Get a human-readable description.
    pub fn description(&self) -> String {
        match self {
            Self::Send { channel_id, .. } => format!("send to {channel_id}"),
            Self::SendQuoted {
                channel_id,
                quote_id,
                ..
            } => format!("reply to {quote_id} in {channel_id}"),
            Self::Execute {
                channel_id,
                command,
            } => format!("execute `{command}` in {channel_id}"),
        }
    }
}

/// Actions for a response. Only `Success` produces any.
///
/// The reply comes first, commands follow in the order the model gave them.
/// A reply whose body renders empty is not sent.
pub fn plan_actions(response: &InterpretedResponse) -> Vec<Action> {
    let InterpretedResponse::Success {
        segments,
        address,
        quote,
        commands,
        ..
    } = response
    else {
        return Vec::new();
    };

    let body: Vec<Segment> = segments
        .iter()
        .filter(|s| !matches!(s, Segment::Quote { .. }))
        .cloned()
        .collect();
    let text = render(&body);

    let mut actions = Vec::with_capacity(1 + commands.len());
    if !text.trim().is_empty() {
        actions.push(match quote {
            Some(quote_id) => Action::SendQuoted {
                channel_id: address.clone(),
                text,
                quote_id: quote_id.clone(),
            },
            None => Action::Send {
                channel_id: address.clone(),
                text,
            },
        });
    }
    actions.extend(commands.iter().map(|command| Action::Execute {
        channel_id: address.clone(),
        command: command.clone(),
    }));
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterpretError;

    fn success(segments: Vec<Segment>, quote: Option<&str>, commands: &[&str]) -> InterpretedResponse {
        InterpretedResponse::Success {
            text: String::new(),
            segments,
            address: "g1".into(),
            quote: quote.map(String::from),
            next_trigger: None,
            logic: None,
            commands: commands.iter().map(|c| c.to_string()).collect(),
            usage: None,
        }
    }

    #[test]
    fn test_plain_reply() {
        let actions = plan_actions(&success(vec![Segment::text("hi")], None, &[]));
        assert_eq!(
            actions,
            vec![Action::Send {
                channel_id: "g1".into(),
                text: "hi".into()
            }]
        );
    }

    #[test]
    fn test_quoted_reply_then_commands() {
        let actions = plan_actions(&success(
            vec![Segment::Quote { id: "9".into() }, Segment::MentionAll, Segment::text(" hi")],
            Some("9"),
            &["poke"],
        ));
        assert_eq!(
            actions,
            vec![
                Action::SendQuoted {
                    channel_id: "g1".into(),
                    text: "<at type=\"all\"/> hi".into(),
                    quote_id: "9".into()
                },
                Action::Execute {
                    channel_id: "g1".into(),
                    command: "poke".into()
                },
            ]
        );
    }

    #[test]
    fn test_non_success_plans_nothing() {
        let skip = InterpretedResponse::Skip {
            next_trigger: None,
            logic: None,
            usage: None,
        };
        assert!(plan_actions(&skip).is_empty());

        let fail = InterpretedResponse::Fail {
            raw_content: "x".into(),
            reason: InterpretError::NoJson,
            usage: None,
        };
        assert!(plan_actions(&fail).is_empty());
    }

    #[test]
    fn test_action_serialization() {
        let action = Action::Execute {
            channel_id: "g1".into(),
            command: "poke".into(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "execute");
        assert_eq!(action.description(), "execute `poke` in g1");
    }
}
