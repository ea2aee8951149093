//! Core traits and types shared by the chime responder crates.
//!
//! This crate defines:
//!
//! - [`ChatMessage`] / [`Mark`] - Messages tracked by the queue and their classification
//! - [`Adapter`] - The trait every language-model backend implements
//! - [`BrainError`] - Errors raised by adapters and memory stores
//! - [`Segment`] - Outbound message pieces rendered to host markup
//! - [`FunctionExecutor`] / [`MemoryStore`] - Contracts behind model function calls
//!
//! # Example
//!
//! ```rust
//! use brain_core::{async_trait, Adapter, AdapterReply, BrainError, Turn};
//!
//! struct Canned;
//!
//! #[async_trait]
//! impl Adapter for Canned {
//!     async fn call(&self, _system: &str, _turns: &[Turn]) -> Result<AdapterReply, BrainError> {
//!         Ok(AdapterReply::text(r#"{"status":"skip"}"#, None))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Canned"
//!     }
//! }
//! ```

mod adapter;
mod error;
pub mod markup;
mod memory;
mod message;
mod prompt;
mod tools;

pub use adapter::{Adapter, AdapterReply, Role, Turn, Usage};
pub use error::BrainError;
pub use markup::Segment;
pub use memory::{InMemoryMemory, MemoryStore, Passage};
pub use message::{
    ChannelKind, ChatMessage, InboundChat, Mark, MarkTransitionError, PRIVATE_CHANNEL_PREFIX,
};
pub use prompt::{hash_prompt, short_fingerprint};
pub use tools::{format_results, FunctionCall, FunctionExecutor, FunctionResult};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
