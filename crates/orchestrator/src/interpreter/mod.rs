//! Turns raw model output into a structured response.
//!
//! The output is expected to hold one JSON object somewhere in it:
//!
//! ```text
//! {"status": "success", "finalReply": "hi @Ann [emoji:smile]", "select": 12, "nextReplyIn": 3}
//! {"status": "skip", "nextReplyIn": 5}
//! {"status": "function", "functions": [{"name": "archival_memory_search", "params": {"query": "cats"}}]}
//! ```
//!
//! Anything that cannot be read becomes [`InterpretedResponse::Fail`] with
//! the raw text preserved; interpretation itself never errors.

pub mod emoji;
pub mod extract;
pub mod fields;
pub mod mentions;

use brain_core::markup::normalize;
use brain_core::{FunctionCall, Segment, Usage};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ReplyMode;
use crate::directory::Member;
use crate::error::InterpretError;

pub use emoji::{BigramSimilarity, EmojiEntry, EmojiResolver, EmojiTable, NameSimilarity};

/// Result of interpreting one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedResponse {
    /// A reply to deliver.
    Success {
        /// Reply text as the model wrote it.
        text: String,
        /// Rendered body: optional quote, then text, mentions and emoji.
        segments: Vec<Segment>,
        /// Channel to deliver to.
        address: String,
        /// Quoted message id.
        quote: Option<String>,
        /// Suggested countdown for the next invocation.
        next_trigger: Option<i64>,
        /// The model's reasoning.
        logic: Option<String>,
        /// Host commands to run after the reply.
        commands: Vec<String>,
        /// Token usage of the turn.
        usage: Option<Usage>,
    },
    /// The model chose not to reply.
    Skip {
        /// Suggested countdown for the next invocation.
        next_trigger: Option<i64>,
        /// The model's reasoning.
        logic: Option<String>,
        /// Token usage of the turn.
        usage: Option<Usage>,
    },
    /// The model wants functions run before it answers.
    FunctionCall {
        /// Requested calls, in order.
        calls: Vec<FunctionCall>,
        /// Token usage so far.
        usage: Option<Usage>,
    },
    /// The output could not be used.
    Fail {
        /// Raw model output.
        raw_content: String,
        /// What went wrong.
        reason: InterpretError,
        /// Token usage of the turn.
        usage: Option<Usage>,
    },
}

impl InterpretedResponse {
    /// Token usage carried by any variant.
    pub fn usage(&self) -> Option<Usage> {
        match self {
            Self::Success { usage, .. }
            | Self::Skip { usage, .. }
            | Self::FunctionCall { usage, .. }
            | Self::Fail { usage, .. } => *usage,
        }
    }
}

/// What the interpreter needs to know about the turn.
#[derive(Debug, Clone, Copy)]
pub struct InterpretContext<'a> {
    /// Channel that triggered the turn, the default address.
    pub channel_id: &'a str,
    /// Members mentions are resolved against.
    pub members: &'a [Member],
    /// Usage reported by the adapter.
    pub usage: Option<Usage>,
}

/// Parses model output under a reply mode.
#[derive(Clone)]
pub struct ResponseInterpreter {
    mode: ReplyMode,
    emoji: EmojiResolver,
}

impl ResponseInterpreter {
    /// Create an interpreter.
    pub fn new(mode: ReplyMode, emoji: EmojiResolver) -> Self {
        Self { mode, emoji }
    }

    /// The configured reply mode.
    pub fn mode(&self) -> ReplyMode {
        self.mode
    }

    /// Interpret an adapter reply's content.
    pub async fn interpret(&self, content: &Value, ctx: &InterpretContext<'_>) -> InterpretedResponse {
        let raw = match content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.interpret_text(&raw, ctx).await
    }

    /// Interpret raw text.
    pub async fn interpret_text(&self, raw: &str, ctx: &InterpretContext<'_>) -> InterpretedResponse {
        match self.try_interpret(raw, ctx).await {
            Ok(response) => response,
            Err(reason) => {
                warn!(
                    channel = %ctx.channel_id,
                    reason = %reason,
                    raw = %raw,
                    "INTERPRET_FAILED"
                );
                InterpretedResponse::Fail {
                    raw_content: raw.to_string(),
                    reason,
                    usage: ctx.usage,
                }
            }
        }
    }

    async fn try_interpret(
        &self,
        raw: &str,
        ctx: &InterpretContext<'_>,
    ) -> Result<InterpretedResponse, InterpretError> {
        let span = extract::json_span(raw).ok_or(InterpretError::NoJson)?;
        let value = extract::parse_lenient(span)?;
        let obj = value
            .as_object()
            .ok_or_else(|| InterpretError::Malformed("expected a JSON object".into()))?;

        let status = fields::status(obj)?;
        debug!(channel = %ctx.channel_id, status = %status, "interpreting reply");
        match status.as_str() {
            "success" => self.assemble(obj, ctx).await,
            "skip" => Ok(InterpretedResponse::Skip {
                next_trigger: fields::coerce_int(obj, "nextReplyIn")?,
                logic: fields::logic(obj),
                usage: ctx.usage,
            }),
            "function" => {
                let calls = fields::function_calls(obj)?;
                if calls.is_empty() {
                    return Err(InterpretError::MissingField("functions"));
                }
                Ok(InterpretedResponse::FunctionCall {
                    calls,
                    usage: ctx.usage,
                })
            }
            other => Err(InterpretError::UnknownStatus(other.to_string())),
        }
    }

    async fn assemble(
        &self,
        obj: &fields::Object,
        ctx: &InterpretContext<'_>,
    ) -> Result<InterpretedResponse, InterpretError> {
        let Some(text) = fields::reply_text(obj, self.mode) else {
            let calls = fields::function_calls(obj)?;
            if !calls.is_empty() {
                return Ok(InterpretedResponse::FunctionCall {
                    calls,
                    usage: ctx.usage,
                });
            }
            return Err(match self.mode {
                ReplyMode::Strict => InterpretError::MissingField(fields::STRICT_REPLY_FIELD),
                ReplyMode::Lenient => InterpretError::NoReply,
            });
        };

        let quote = fields::quote(obj)?;
        let next_trigger = fields::coerce_int(obj, "nextReplyIn")?;
        let address = fields::address(obj)?.unwrap_or_else(|| ctx.channel_id.to_string());

        let mut segments = Vec::new();
        if let Some(id) = &quote {
            segments.push(Segment::Quote { id: id.clone() });
        }
        let body = mentions::tokenize(&text, ctx.members);
        segments.extend(self.emoji.substitute(body).await);

        Ok(InterpretedResponse::Success {
            text,
            segments: normalize(segments),
            address,
            quote,
            next_trigger,
            logic: fields::logic(obj),
            commands: fields::commands(obj),
            usage: ctx.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter(mode: ReplyMode) -> ResponseInterpreter {
        ResponseInterpreter::new(mode, EmojiResolver::new(EmojiTable::new([("smile", "100")]), "0"))
    }

    fn ctx<'a>(members: &'a [Member]) -> InterpretContext<'a> {
        InterpretContext {
            channel_id: "g1",
            members,
            usage: None,
        }
    }

    #[tokio::test]
    async fn test_success_with_quote_mention_and_emoji() {
        let members = vec![Member::new("Ann", "u1")];
        let raw = r#"ok: {"status":"success","finalReply":"hi @Ann [emoji:smile]","select":12,"nextReplyIn":"3"}"#;
        let response = interpreter(ReplyMode::Lenient)
            .interpret_text(raw, &ctx(&members))
            .await;

        let InterpretedResponse::Success {
            segments,
            address,
            quote,
            next_trigger,
            ..
        } = response
        else {
            panic!("expected success");
        };
        assert_eq!(address, "g1");
        assert_eq!(quote.as_deref(), Some("12"));
        assert_eq!(next_trigger, Some(3));
        assert_eq!(
            segments,
            vec![
                Segment::Quote { id: "12".into() },
                Segment::text("hi "),
                Segment::Mention {
                    id: "u1".into(),
                    name: "Ann".into()
                },
                Segment::text(" "),
                Segment::Emoji {
                    id: "100".into(),
                    name: "smile".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_skip() {
        let response = interpreter(ReplyMode::Lenient)
            .interpret_text(r#"{"status":"skip","nextReplyIn":5,"logic":"quiet"}"#, &ctx(&[]))
            .await;
        assert_eq!(
            response,
            InterpretedResponse::Skip {
                next_trigger: Some(5),
                logic: Some("quiet".into()),
                usage: None
            }
        );
    }

    #[tokio::test]
    async fn test_fractional_string_countdown_is_coerced() {
        let response = interpreter(ReplyMode::Lenient)
            .interpret_text(
                r#"{"status":"success","finalReply":"hi","nextReplyIn":"3.0"}"#,
                &ctx(&[]),
            )
            .await;
        assert!(matches!(
            response,
            InterpretedResponse::Success {
                next_trigger: Some(3),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_no_json_preserves_raw() {
        let response = interpreter(ReplyMode::Lenient)
            .interpret_text("I'd rather not.", &ctx(&[]))
            .await;
        assert_eq!(
            response,
            InterpretedResponse::Fail {
                raw_content: "I'd rather not.".into(),
                reason: InterpretError::NoJson,
                usage: None
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_status_fails() {
        let response = interpreter(ReplyMode::Lenient)
            .interpret_text(r#"{"status":"maybe"}"#, &ctx(&[]))
            .await;
        assert!(matches!(
            response,
            InterpretedResponse::Fail {
                reason: InterpretError::UnknownStatus(s),
                ..
            } if s == "maybe"
        ));
    }

    #[tokio::test]
    async fn test_strict_and_lenient_modes() {
        let raw = r#"{"status":"success","reply":"hello"}"#;
        assert!(matches!(
            interpreter(ReplyMode::Lenient).interpret_text(raw, &ctx(&[])).await,
            InterpretedResponse::Success { text, .. } if text == "hello"
        ));
        assert!(matches!(
            interpreter(ReplyMode::Strict).interpret_text(raw, &ctx(&[])).await,
            InterpretedResponse::Fail {
                reason: InterpretError::MissingField("finalReply"),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_non_numeric_select_fails() {
        let raw = r#"{"status":"success","finalReply":"x","select":"first"}"#;
        assert!(matches!(
            interpreter(ReplyMode::Lenient).interpret_text(raw, &ctx(&[])).await,
            InterpretedResponse::Fail {
                reason: InterpretError::NumberCoercion { field: "select", .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_function_status() {
        let raw = r#"{"status":"function","functions":[{"name":"conversation_search","params":{"query":"cats"}}]}"#;
        let response = interpreter(ReplyMode::Lenient).interpret_text(raw, &ctx(&[])).await;
        let InterpretedResponse::FunctionCall { calls, .. } = response else {
            panic!("expected function call");
        };
        assert_eq!(calls[0].name, "conversation_search");
    }

    #[tokio::test]
    async fn test_reply_to_overrides_address() {
        let raw = r#"{"status":"success","finalReply":"over here","replyTo":"g2","execute":["poke"]}"#;
        let response = interpreter(ReplyMode::Lenient).interpret_text(raw, &ctx(&[])).await;
        let InterpretedResponse::Success { address, commands, .. } = response else {
            panic!("expected success");
        };
        assert_eq!(address, "g2");
        assert_eq!(commands, vec!["poke"]);
    }

    #[tokio::test]
    async fn test_structured_content_is_interpreted() {
        let content = serde_json::json!({"status": "skip"});
        let response = interpreter(ReplyMode::Lenient).interpret(&content, &ctx(&[])).await;
        assert!(matches!(response, InterpretedResponse::Skip { .. }));
    }
}
