//! Mock adapters for exercising chime without a model backend.
//!
//! This crate provides implementations of the `Adapter` trait for testing:
//! - `EchoAdapter` - Echoes the last user turn back
//! - `ScriptedAdapter` - Replays prepared replies and errors, recording calls
//! - `FailingAdapter` - Fails every call with the same error
//! - `DelayedAdapter` - Adds backend latency and counts calls in flight
//!
//! For real backends, use the `llm-adapter` crate instead.
//!
//! # Example
//!
//! ```rust
//! use mock_brain::{Adapter, ScriptedAdapter, Turn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_brain::BrainError> {
//!     let adapter = ScriptedAdapter::with_replies("scripted", [r#"{"status":"skip"}"#]);
//!
//!     let reply = adapter.call("system prompt", &[Turn::user("Hello!")]).await?;
//!     println!("Reply: {}", reply.content_text());
//!     Ok(())
//! }
//! ```

// Mock implementations
mod delayed;
mod echo;
mod failing;
mod scripted;

// Re-export brain-core types for convenience
pub use brain_core::{async_trait, Adapter, AdapterReply, BrainError, Turn, Usage};

// Export mock implementations
pub use delayed::DelayedAdapter;
pub use echo::EchoAdapter;
pub use failing::FailingAdapter;
pub use scripted::{RecordedCall, ScriptedAdapter};
