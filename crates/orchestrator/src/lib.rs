//! Turn pipeline for a multi-channel chat responder.
//!
//! This crate provides the [`Orchestrator`] type which takes inbound chat
//! messages, decides when a channel is due for a reply, calls a roster of
//! language-model backends and delivers what the model asked for.
//!
//! # Features
//!
//! - Per-channel windows and countdowns (via chat-queue)
//! - Ordered backend roster with failover on transport errors
//! - Lenient JSON interpretation of model output
//! - Mentions, quotes and custom emoji rendered to host markup
//! - Bounded function-call loop over long-term memory
//!
//! # Architecture
//!
//! ```text
//! Inbound message (from the host)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Enter the channel gate                                  │
//! │         ↓                                                   │
//! │  2. Enqueue, evaluate the trigger, leave the gate           │
//! │         ↓  (due, no turn running in the channel)            │
//! │  3. Build the prompt from the channel or slot window        │
//! │         ↓                                                   │
//! │  4. Call the roster with failover                           │
//! │     • function → run memory functions, call again           │
//! │         ↓                                                   │
//! │  5. Interpret: success / skip / fail                        │
//! │         ↓                                                   │
//! │  6. Dispatch actions, reset the countdown                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use orchestrator::{InboundChat, LoggingSink, Orchestrator, TurnContext};
//!
//! # async fn example() -> Result<(), orchestrator::OrchestratorError> {
//! let orchestrator = Orchestrator::from_env(LoggingSink)?;
//!
//! let message = InboundChat {
//!     channel_id: "group-1".to_string(),
//!     sender_id: "alice".to_string(),
//!     sender_name: Some("Alice".to_string()),
//!     content: "anyone around?".to_string(),
//!     message_id: "m1".to_string(),
//!     timestamp: 1_700_000_000_000,
//! };
//! let outcome = orchestrator.handle(message, &TurnContext::default()).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod actions;
mod config;
mod directory;
mod error;
mod functions;
pub mod interpreter;
mod orchestrator;
mod prompt;
mod sender;
mod switcher;

// Public exports
pub use actions::{plan_actions, Action};
pub use config::{
    BotConfig, BotConfigBuilder, ReplyMode, DEFAULT_EMOJI_FALLBACK_ID, DEFAULT_FUNCTION_DEPTH,
    DEFAULT_PROMPT_FILE,
};
pub use directory::{Member, MemberDirectory, StaticDirectory};
pub use error::{InterpretError, OrchestratorError};
pub use functions::{MemoryFunctions, DEFAULT_PAGE_SIZE, FUNCTION_NAMES};
pub use interpreter::{
    BigramSimilarity, EmojiEntry, EmojiResolver, EmojiTable, InterpretContext, InterpretedResponse,
    NameSimilarity, ResponseInterpreter,
};
pub use orchestrator::{Orchestrator, TurnContext, TurnOutcome};
pub use prompt::{Prompt, PromptBuilder, PromptContext, TranscriptPrompt, DEFAULT_SYSTEM_PROMPT};
pub use sender::{dispatch, DeliverySink, LoggingSink, NoOpSink, RecordingSink};
pub use switcher::{AdapterFactory, AdapterSwitcher, LlmAdapterFactory};

// Re-export commonly used types from dependencies
pub use brain_core::{ChatMessage, InboundChat, Mark, Segment};
pub use chat_queue::{EnqueueOutcome, QueueConfig, TriggerConfig};
pub use llm_adapter::{AdapterEntry, AdapterKind};
