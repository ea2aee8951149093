//! Message storage behind the queue.
//!
//! The queue only talks to a [`MessageStore`], so a database-backed store can
//! replace [`InMemoryStore`] without touching window or trigger logic.

use std::collections::VecDeque;

use async_trait::async_trait;
use brain_core::{ChannelKind, ChatMessage};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::DEFAULT_MAX_CHANNELS;
use crate::error::QueueError;

/// Which stored messages a removal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    /// Every message of one channel.
    Channel(&'a str),
    /// Every message from one sender, across channels.
    Sender(&'a str),
    /// Every message in channels of one kind.
    Kind(ChannelKind),
}

impl Selector<'_> {
    fn matches_channel(&self, channel_id: &str) -> Option<bool> {
        match self {
            Self::Channel(id) => Some(*id == channel_id),
            Self::Kind(kind) => Some(ChannelKind::of(channel_id) == *kind),
            Self::Sender(_) => None,
        }
    }
}

/// Backing storage for channel windows.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store a message. Returns `false` if its id is already in the channel.
    async fn insert(&self, message: ChatMessage) -> Result<bool, QueueError>;

    /// The most recent `limit` messages of a channel, oldest first.
    async fn recent(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>, QueueError>;

    /// Remove matching messages and return how many were removed.
    async fn remove(&self, selector: Selector<'_>) -> Result<usize, QueueError>;
}

/// Process-local [`MessageStore`] with a per-channel cap and LRU channel eviction.
#[derive(Debug)]
pub struct InMemoryStore {
    /// Uses IndexMap insertion order for LRU eviction.
    channels: RwLock<IndexMap<String, VecDeque<ChatMessage>>>,
    capacity: usize,
    max_channels: usize,
}

impl InMemoryStore {
    /// Keep at most `capacity` messages per channel.
    pub fn new(capacity: usize) -> Self {
        Self::with_limits(capacity, DEFAULT_MAX_CHANNELS)
    }

    /// Keep at most `capacity` messages per channel and `max_channels` channels.
    pub fn with_limits(capacity: usize, max_channels: usize) -> Self {
        Self {
            channels: RwLock::new(IndexMap::new()),
            capacity: capacity.max(1),
            max_channels: max_channels.max(1),
        }
    }

    /// Number of channels currently tracked.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert(&self, message: ChatMessage) -> Result<bool, QueueError> {
        let mut channels = self.channels.write().await;
        let channel_id = message.channel_id.clone();

        // Remove and re-insert to mark the channel as recently used.
        let mut window = channels.shift_remove(&channel_id).unwrap_or_default();
        let inserted = if window.iter().any(|m| m.id == message.id) {
            false
        } else {
            // Stable for equal timestamps: later arrivals stay later.
            let at = window.partition_point(|m| m.timestamp <= message.timestamp);
            window.insert(at, message);
            while window.len() > self.capacity {
                window.pop_front();
            }
            true
        };
        channels.insert(channel_id, window);

        while channels.len() > self.max_channels {
            if let Some((evicted, _)) = channels.shift_remove_index(0) {
                debug!(channel = %evicted, "evicted cold channel window");
            }
        }

        Ok(inserted)
    }

    async fn recent(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>, QueueError> {
        let channels = self.channels.read().await;
        let Some(window) = channels.get(channel_id) else {
            return Ok(Vec::new());
        };
        let skip = window.len().saturating_sub(limit);
        Ok(window.iter().skip(skip).cloned().collect())
    }

    async fn remove(&self, selector: Selector<'_>) -> Result<usize, QueueError> {
        let mut channels = self.channels.write().await;
        let mut removed = 0;

        match selector {
            Selector::Sender(sender_id) => {
                for window in channels.values_mut() {
                    let before = window.len();
                    window.retain(|m| m.sender_id != sender_id);
                    removed += before - window.len();
                }
                channels.retain(|_, window| !window.is_empty());
            }
            _ => {
                channels.retain(|channel_id, window| {
                    if selector.matches_channel(channel_id) == Some(true) {
                        removed += window.len();
                        false
                    } else {
                        true
                    }
                });
            }
        }

        Ok(removed)
    }
}
