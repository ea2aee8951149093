//! Scripted adapter - replays a fixed sequence of replies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use brain_core::{Adapter, AdapterReply, BrainError, Turn, Usage};
use tokio::sync::Mutex;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// System prompt sent.
    pub system_prompt: String,
    /// Turns sent.
    pub turns: Vec<Turn>,
}

/// An adapter that answers from a queue of prepared results.
///
/// Every call is recorded. Once the script runs out, calls fail with
/// [`BrainError::InvalidResponse`].
pub struct ScriptedAdapter {
    name: String,
    script: Mutex<VecDeque<Result<AdapterReply, BrainError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_count: AtomicUsize,
}

impl ScriptedAdapter {
    /// Create an adapter with an empty script.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create an adapter that replies with each text in order.
    pub fn with_replies<I, S>(name: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = replies
            .into_iter()
            .map(|text| Ok(AdapterReply::text(text, None)))
            .collect();
        Self {
            script: Mutex::new(script),
            ..Self::new(name)
        }
    }

    /// Queue a text reply.
    pub async fn push_reply(&self, text: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Ok(AdapterReply::text(text, None)));
    }

    /// Queue a text reply with token usage.
    pub async fn push_reply_with_usage(&self, text: impl Into<String>, usage: Usage) {
        self.script
            .lock()
            .await
            .push_back(Ok(AdapterReply::text(text, Some(usage))));
    }

    /// Queue an error.
    pub async fn push_error(&self, error: BrainError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Calls received so far.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Replies still queued.
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    async fn call(&self, system_prompt: &str, turns: &[Turn]) -> Result<AdapterReply, BrainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            turns: turns.to_vec(),
        });

        self.script.lock().await.pop_front().unwrap_or_else(|| {
            Err(BrainError::InvalidResponse(format!(
                "{} has no scripted reply left",
                self.name
            )))
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
