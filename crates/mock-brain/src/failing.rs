//! Failing adapter - always returns the same error.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use brain_core::{Adapter, AdapterReply, BrainError, Turn};

/// An adapter whose every call fails.
///
/// Useful for exercising failover and exhaustion paths.
pub struct FailingAdapter {
    name: String,
    error: BrainError,
    call_count: AtomicUsize,
}

impl FailingAdapter {
    /// Fail every call with `error`.
    pub fn new(name: impl Into<String>, error: BrainError) -> Self {
        Self {
            name: name.into(),
            error,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Fail every call with a network error.
    pub fn network(name: impl Into<String>) -> Self {
        Self::new(name, BrainError::Network("connection refused".to_string()))
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for FailingAdapter {
    async fn call(&self, _system_prompt: &str, _turns: &[Turn]) -> Result<AdapterReply, BrainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
