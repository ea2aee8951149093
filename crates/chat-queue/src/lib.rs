//! Message windows and invocation cadence for chime.
//!
//! This crate provides:
//!
//! - [`QueueManager`] - Per-channel and per-slot message windows with mark-based dedup
//! - [`TriggerScheduler`] - The countdown/mention gate deciding when to call a model
//! - [`ChannelGate`] - Serializes enqueue and evaluation per channel
//! - [`MentionDetector`] - Detects when the bot is addressed
//!
//! # Example
//!
//! ```rust
//! use brain_core::ChatMessage;
//! use chat_queue::{QueueConfig, QueueManager, TriggerConfig, TriggerScheduler, TriggerSignals};
//!
//! # async fn example() -> Result<(), chat_queue::QueueError> {
//! let queue = QueueManager::in_memory(QueueConfig::default())?;
//! let scheduler = TriggerScheduler::with_config(TriggerConfig::default())?;
//!
//! let mut message = ChatMessage::new("m1", "group-1", "alice", "hello", 1_700_000_000_000);
//! if queue.enqueue(&mut message).await?.is_accepted() {
//!     let decision = scheduler.evaluate("group-1", TriggerSignals::default()).await;
//!     println!("due: {}", decision.is_due());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod gate;
mod mention;
mod queue;
mod store;
mod trigger;

pub use config::{
    QueueConfig, TriggerConfig, DEFAULT_CLEAR_COMMAND, DEFAULT_MAX_CHANNELS, DEFAULT_SLOT_SIZE,
};
pub use error::QueueError;
pub use gate::{ChannelGate, GateGuard};
pub use mention::{MentionKind, MentionDetector};
pub use queue::{EnqueueOutcome, QueueManager};
pub use store::{InMemoryStore, MessageStore, Selector};
pub use trigger::{
    DueReason, TriggerDecision, TriggerScheduler, TriggerSignals, TriggerStore, FIRING_THRESHOLD,
};
