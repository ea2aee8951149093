//! Error types for queue and scheduler operations.

use brain_core::MarkTransitionError;
use thiserror::Error;

/// Errors that can occur in the queue, its store, or the scheduler.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// A message mark was moved backwards.
    #[error(transparent)]
    Mark(#[from] MarkTransitionError),

    /// Queue or trigger settings are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
