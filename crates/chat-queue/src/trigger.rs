//! Trigger scheduler: decides when a channel is due for a model call.
//!
//! Each channel carries a countdown in `[1, max_trigger_count]`. Every
//! accepted message lowers it by one, never below 1, and a channel whose
//! countdown sits at 1 is due. A channel can also become due early: its
//! window or slot overflowed, the bot was mentioned and won the mention
//! draw, or the debug override is on. After a call the countdown is reset to
//! the model's suggestion (clamped) or to a random value in range.

use std::sync::Arc;

use indexmap::IndexMap;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::config::{TriggerConfig, DEFAULT_MAX_CHANNELS};
use crate::error::QueueError;

/// Countdown value at which a channel fires.
pub const FIRING_THRESHOLD: u32 = 1;

/// Why a channel became due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueReason {
    /// The countdown reached the firing threshold.
    Countdown,
    /// The channel window holds more than a slot's worth of messages.
    WindowOverflow,
    /// The merged slot window holds more than a slot's worth of messages.
    SlotOverflow,
    /// The bot was mentioned and the mention draw succeeded.
    Mentioned,
    /// Debug override.
    Forced,
}

/// Result of [`TriggerScheduler::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Invoke the model now.
    Due(DueReason),
    /// Keep waiting; `remaining` is the countdown after this message.
    Idle {
        /// Countdown value.
        remaining: u32,
    },
}

impl TriggerDecision {
    /// Whether the model should be invoked.
    pub fn is_due(&self) -> bool {
        matches!(self, Self::Due(_))
    }
}

/// What the caller observed about a channel when a message arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerSignals {
    /// The channel window exceeds the slot size.
    pub window_overflow: bool,
    /// The merged slot window exceeds the slot size.
    pub slot_overflow: bool,
    /// The bot was addressed by a mention.
    pub mentioned: bool,
}

/// Per-channel countdowns with LRU eviction of cold channels.
#[derive(Debug)]
pub struct TriggerStore {
    counters: RwLock<IndexMap<String, u32>>,
    max_channels: usize,
}

impl Default for TriggerStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHANNELS)
    }
}

impl TriggerStore {
    /// Track at most `max_channels` channels.
    pub fn new(max_channels: usize) -> Self {
        Self {
            counters: RwLock::new(IndexMap::new()),
            max_channels: max_channels.max(1),
        }
    }

    /// Current countdown of a channel.
    pub async fn get(&self, channel_id: &str) -> Option<u32> {
        self.counters.read().await.get(channel_id).copied()
    }

    /// Update a channel's countdown with `f`, seeding it with `seed` first if
    /// the channel is new. Returns the stored value.
    pub async fn update(
        &self,
        channel_id: &str,
        seed: impl FnOnce() -> u32,
        f: impl FnOnce(u32) -> u32,
    ) -> u32 {
        let mut counters = self.counters.write().await;
        // Remove and re-insert to mark as recently used.
        let current = counters.shift_remove(channel_id).unwrap_or_else(seed);
        let next = f(current);
        counters.insert(channel_id.to_string(), next);

        while counters.len() > self.max_channels {
            if let Some((evicted, _)) = counters.shift_remove_index(0) {
                debug!(channel = %evicted, "evicted cold trigger state");
            }
        }
        next
    }

    /// Number of channels tracked.
    pub async fn len(&self) -> usize {
        self.counters.read().await.len()
    }

    /// Whether no channel is tracked.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Decides, per channel, whether the model should be invoked now.
pub struct TriggerScheduler {
    store: Arc<TriggerStore>,
    config: TriggerConfig,
}

impl TriggerScheduler {
    /// Create a scheduler over an injected state store.
    pub fn new(store: Arc<TriggerStore>, config: TriggerConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Create a scheduler with its own store sized from the config.
    pub fn with_config(config: TriggerConfig) -> Result<Self, QueueError> {
        let store = Arc::new(TriggerStore::new(config.max_channels));
        Self::new(store, config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Current countdown of a channel, if it has been seen.
    pub async fn counter(&self, channel_id: &str) -> Option<u32> {
        self.store.get(channel_id).await
    }

    fn random_count(&self) -> u32 {
        rand::thread_rng().gen_range(self.config.min_trigger_count..=self.config.max_trigger_count)
    }

    fn clamp(&self, value: i64) -> u32 {
        let min = i64::from(self.config.min_trigger_count);
        let max = i64::from(self.config.max_trigger_count);
        // Bounds are validated u32 values, so the clamp result fits.
        value.clamp(min, max) as u32
    }

    fn mention_draw(&self) -> bool {
        rand::thread_rng().gen_bool(self.config.mention_probability)
    }

    /// Count an accepted message and decide whether the channel is due.
    pub async fn evaluate(&self, channel_id: &str, signals: TriggerSignals) -> TriggerDecision {
        let seed = self.random_count();
        let remaining = self
            .store
            .update(channel_id, || seed, |n| n.saturating_sub(1).max(FIRING_THRESHOLD))
            .await;
        trace!(channel = %channel_id, remaining, ?signals, "trigger countdown");

        let decision = if self.config.force_trigger {
            TriggerDecision::Due(DueReason::Forced)
        } else if remaining == FIRING_THRESHOLD {
            TriggerDecision::Due(DueReason::Countdown)
        } else if signals.window_overflow {
            TriggerDecision::Due(DueReason::WindowOverflow)
        } else if signals.slot_overflow {
            TriggerDecision::Due(DueReason::SlotOverflow)
        } else if signals.mentioned && self.mention_draw() {
            TriggerDecision::Due(DueReason::Mentioned)
        } else {
            TriggerDecision::Idle { remaining }
        };

        if decision.is_due() {
            debug!(channel = %channel_id, ?decision, "channel is due");
        }
        decision
    }

    /// Reset a channel after an invocation and return the new countdown.
    ///
    /// A model suggestion is clamped to `[min, max]`; without one a uniform
    /// random value in `[min, max]` is used.
    pub async fn reset(&self, channel_id: &str, suggestion: Option<i64>) -> u32 {
        let next = match suggestion {
            Some(value) => self.clamp(value),
            None => self.random_count(),
        };
        self.store.update(channel_id, || next, |_| next).await;
        debug!(channel = %channel_id, next, suggested = ?suggestion, "trigger reset");
        next
    }
}
