//! The queue manager: per-channel and per-slot message windows.

use std::sync::Arc;

use brain_core::{ChannelKind, ChatMessage, Mark};
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::store::{InMemoryStore, MessageStore, Selector};

/// What happened to a message handed to [`QueueManager::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Stored in its channel window.
    Accepted,
    /// Its id was already stored.
    Duplicate,
    /// It carried a mark outside the self-report set.
    AlreadyMarked(Mark),
    /// It was the clear-memory command.
    ClearCommand,
}

impl EnqueueOutcome {
    /// Whether the message entered the window.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Bounded, time-ordered message windows keyed by channel.
///
/// Windows are read with one extra element (`limit + 1`) so callers can tell
/// "exactly full" from "over capacity" without a separate count.
pub struct QueueManager {
    store: Arc<dyn MessageStore>,
    config: QueueConfig,
}

impl QueueManager {
    /// Create a queue over an existing store.
    pub fn new(store: Arc<dyn MessageStore>, config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Create a queue backed by an [`InMemoryStore`] sized from the config.
    pub fn in_memory(config: QueueConfig) -> Result<Self, QueueError> {
        let store = InMemoryStore::with_limits(config.slot_size + 1, config.max_channels);
        Self::new(Arc::new(store), config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Configured window size.
    pub fn slot_size(&self) -> usize {
        self.config.slot_size
    }

    /// The slot a channel belongs to, if any.
    pub fn slot_for(&self, channel_id: &str) -> Option<&[String]> {
        self.config.slot_for(channel_id)
    }

    /// Whether `content` is the clear-memory command.
    pub fn is_clear_command(&self, content: &str) -> bool {
        !self.config.clear_memory_command.is_empty()
            && content.trim() == self.config.clear_memory_command
    }

    /// Record a message in its channel window.
    ///
    /// The message's mark is updated in place: `Unknown` becomes `Added`,
    /// the clear-memory command becomes `Command`. Marks in the self-report
    /// set are stored unchanged; any other mark means the message was already
    /// handled and it is left out.
    pub async fn enqueue(&self, message: &mut ChatMessage) -> Result<EnqueueOutcome, QueueError> {
        if message.mark != Mark::Unknown && !self.config.self_report_marks.contains(&message.mark) {
            debug!(id = %message.id, mark = ?message.mark, "skipping already marked message");
            return Ok(EnqueueOutcome::AlreadyMarked(message.mark));
        }

        if self.is_clear_command(&message.content) {
            message.advance(Mark::Command)?;
            return Ok(EnqueueOutcome::ClearCommand);
        }

        if message.mark == Mark::Unknown {
            message.advance(Mark::Added)?;
        }

        if self.store.insert(message.clone()).await? {
            Ok(EnqueueOutcome::Accepted)
        } else {
            Ok(EnqueueOutcome::Duplicate)
        }
    }

    /// The most recent `limit + 1` messages of a channel, oldest first.
    pub async fn window(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>, QueueError> {
        self.store.recent(channel_id, limit + 1).await
    }

    /// Merge the windows of several channels by time, keeping the most recent `limit + 1`.
    pub async fn mixed_window(
        &self,
        channel_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ChatMessage>, QueueError> {
        let mut merged = Vec::new();
        for channel_id in channel_ids {
            merged.extend(self.store.recent(channel_id, limit + 1).await?);
        }
        // Stable sort keeps per-channel order for equal timestamps.
        merged.sort_by_key(|m| m.timestamp);
        let skip = merged.len().saturating_sub(limit + 1);
        merged.drain(..skip);
        Ok(merged)
    }

    /// The context a channel answers from: its slot's merged window if it
    /// belongs to one, else its own window.
    pub async fn context_window(&self, channel_id: &str) -> Result<Vec<ChatMessage>, QueueError> {
        match self.slot_for(channel_id) {
            Some(slot) => {
                let slot = slot.to_vec();
                self.mixed_window(&slot, self.config.slot_size).await
            }
            None => self.window(channel_id, self.config.slot_size).await,
        }
    }

    /// Messages of a channel whose content contains `needle` (case-insensitive), oldest first.
    pub async fn search_text(
        &self,
        channel_id: &str,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, QueueError> {
        let needle = needle.to_lowercase();
        let mut hits: Vec<ChatMessage> = self
            .window(channel_id, self.config.slot_size)
            .await?
            .into_iter()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .collect();
        let skip = hits.len().saturating_sub(limit);
        hits.drain(..skip);
        Ok(hits)
    }

    /// Messages of a channel with `from <= timestamp <= to`, oldest first.
    pub async fn search_range(
        &self,
        channel_id: &str,
        from: i64,
        to: i64,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, QueueError> {
        let mut hits: Vec<ChatMessage> = self
            .window(channel_id, self.config.slot_size)
            .await?
            .into_iter()
            .filter(|m| m.timestamp >= from && m.timestamp <= to)
            .collect();
        let skip = hits.len().saturating_sub(limit);
        hits.drain(..skip);
        Ok(hits)
    }

    /// Forget one channel.
    pub async fn clear_channel(&self, channel_id: &str) -> Result<bool, QueueError> {
        self.clear(Selector::Channel(channel_id)).await
    }

    /// Forget everything one sender said, in every channel.
    pub async fn clear_by_sender(&self, sender_id: &str) -> Result<bool, QueueError> {
        self.clear(Selector::Sender(sender_id)).await
    }

    /// Forget every group channel.
    pub async fn clear_all(&self) -> Result<bool, QueueError> {
        self.clear(Selector::Kind(ChannelKind::Group)).await
    }

    /// Forget every private channel.
    pub async fn clear_private_all(&self) -> Result<bool, QueueError> {
        self.clear(Selector::Kind(ChannelKind::Private)).await
    }

    async fn clear(&self, selector: Selector<'_>) -> Result<bool, QueueError> {
        let removed = self.store.remove(selector).await?;
        info!(?selector, removed, "cleared messages");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(slot_size: usize) -> QueueManager {
        QueueManager::in_memory(QueueConfig {
            slot_size,
            slots: vec![vec!["a".into(), "b".into()]],
            ..Default::default()
        })
        .unwrap()
    }

    fn msg(id: &str, channel: &str, ts: i64) -> ChatMessage {
        ChatMessage::new(id, channel, "alice", format!("text {id}"), ts)
    }

    #[tokio::test]
    async fn test_enqueue_marks_added() {
        let queue = queue(5);
        let mut m = msg("1", "a", 1);
        assert_eq!(queue.enqueue(&mut m).await.unwrap(), EnqueueOutcome::Accepted);
        assert_eq!(m.mark, Mark::Added);
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent_for_marked_messages() {
        let queue = queue(5);
        let mut m = msg("1", "a", 1);
        queue.enqueue(&mut m).await.unwrap();
        assert_eq!(
            queue.enqueue(&mut m).await.unwrap(),
            EnqueueOutcome::AlreadyMarked(Mark::Added)
        );
        assert_eq!(queue.window("a", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_self_report_marks_are_recorded() {
        let queue = queue(5);
        let mut own = msg("1", "a", 1).with_mark(Mark::Llm);
        assert!(queue.enqueue(&mut own).await.unwrap().is_accepted());
        assert_eq!(own.mark, Mark::Llm);

        let mut redirected = msg("2", "a", 2).with_mark(Mark::LogicRedirect);
        assert!(!queue.enqueue(&mut redirected).await.unwrap().is_accepted());
    }

    #[tokio::test]
    async fn test_clear_command_not_recorded() {
        let queue = queue(5);
        let mut m = ChatMessage::new("1", "a", "admin", " /clear-memory ", 1);
        assert_eq!(queue.enqueue(&mut m).await.unwrap(), EnqueueOutcome::ClearCommand);
        assert_eq!(m.mark, Mark::Command);
        assert!(queue.window("a", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_window_returns_limit_plus_one_ascending() {
        let queue = queue(3);
        for ts in [5, 1, 4, 2, 3, 6] {
            queue.enqueue(&mut msg(&ts.to_string(), "a", ts)).await.unwrap();
        }
        let window = queue.window("a", 3).await.unwrap();
        let stamps: Vec<i64> = window.iter().map(|m| m.timestamp).collect();
        assert_eq!(stamps, vec![3, 4, 5, 6]);

        let small = queue.window("a", 1).await.unwrap();
        assert_eq!(small.len(), 2);
        assert_eq!(small[1].timestamp, 6);
    }

    #[tokio::test]
    async fn test_mixed_window_merges_by_time() {
        let queue = queue(3);
        for (id, channel, ts) in [("1", "a", 1), ("2", "b", 2), ("3", "a", 3), ("4", "b", 4), ("5", "a", 5)] {
            queue.enqueue(&mut msg(id, channel, ts)).await.unwrap();
        }
        let mixed = queue
            .mixed_window(&["a".to_string(), "b".to_string()], 2)
            .await
            .unwrap();
        let ids: Vec<_> = mixed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4", "5"]);

        let context = queue.context_window("b").await.unwrap();
        assert_eq!(context.len(), 4);
    }

    #[tokio::test]
    async fn test_clear_all_and_private_are_independent() {
        let queue = queue(5);
        queue.enqueue(&mut msg("1", "a", 1)).await.unwrap();
        queue.enqueue(&mut msg("2", "private:alice", 2)).await.unwrap();

        assert!(queue.clear_all().await.unwrap());
        assert!(queue.window("a", 5).await.unwrap().is_empty());
        assert_eq!(queue.window("private:alice", 5).await.unwrap().len(), 1);
        assert!(!queue.clear_all().await.unwrap());

        queue.enqueue(&mut msg("3", "a", 3)).await.unwrap();
        assert!(queue.clear_private_all().await.unwrap());
        assert!(queue.window("private:alice", 5).await.unwrap().is_empty());
        assert_eq!(queue.window("a", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_channel_and_sender() {
        let queue = queue(5);
        queue.enqueue(&mut msg("1", "a", 1)).await.unwrap();
        queue
            .enqueue(&mut ChatMessage::new("2", "b", "bob", "hey", 2))
            .await
            .unwrap();

        assert!(queue.clear_by_sender("bob").await.unwrap());
        assert!(!queue.clear_by_sender("bob").await.unwrap());
        assert!(queue.clear_channel("a").await.unwrap());
        assert!(!queue.clear_channel("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_search() {
        let queue = queue(10);
        queue
            .enqueue(&mut ChatMessage::new("1", "a", "u", "I love Cats", 100))
            .await
            .unwrap();
        queue
            .enqueue(&mut ChatMessage::new("2", "a", "u", "dogs too", 200))
            .await
            .unwrap();

        let hits = queue.search_text("a", "cats", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");

        let hits = queue.search_range("a", 150, 250, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");
    }
}
