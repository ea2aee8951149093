//! Queue and trigger settings.

use std::collections::HashSet;

use brain_core::Mark;

use crate::error::QueueError;

/// Default number of messages a window holds.
pub const DEFAULT_SLOT_SIZE: usize = 20;

/// Default command that wipes a channel's memory.
pub const DEFAULT_CLEAR_COMMAND: &str = "/clear-memory";

/// Default number of channels tracked before LRU eviction.
pub const DEFAULT_MAX_CHANNELS: usize = 10_000;

/// Settings for [`QueueManager`](crate::QueueManager).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Messages per window; the store keeps one extra to detect overflow.
    pub slot_size: usize,

    /// Channel groups whose windows merge into one context.
    pub slots: Vec<Vec<String>>,

    /// Marks that are still recorded even though they are not `Unknown`.
    pub self_report_marks: HashSet<Mark>,

    /// Content that clears memory instead of entering the window.
    pub clear_memory_command: String,

    /// Channels tracked before the least recently used is evicted.
    pub max_channels: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            slot_size: DEFAULT_SLOT_SIZE,
            slots: Vec::new(),
            self_report_marks: HashSet::from([Mark::Llm]),
            clear_memory_command: DEFAULT_CLEAR_COMMAND.to_string(),
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}

impl QueueConfig {
    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.slot_size == 0 {
            return Err(QueueError::InvalidConfig("slot_size must be at least 1".into()));
        }
        if self.max_channels == 0 {
            return Err(QueueError::InvalidConfig("max_channels must be at least 1".into()));
        }
        if self.self_report_marks.contains(&Mark::Unknown) {
            return Err(QueueError::InvalidConfig(
                "Unknown cannot be a self-report mark".into(),
            ));
        }
        Ok(())
    }

    /// The slot a channel belongs to, if any.
    pub fn slot_for(&self, channel_id: &str) -> Option<&[String]> {
        self.slots
            .iter()
            .find(|slot| slot.iter().any(|c| c == channel_id))
            .map(Vec::as_slice)
    }

    /// Parse slots written as `a,b;c,d`.
    pub fn parse_slots(value: &str) -> Vec<Vec<String>> {
        value
            .split(';')
            .map(|group| {
                group
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }
}

/// Settings for [`TriggerScheduler`](crate::TriggerScheduler).
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Lower bound of the countdown (at least 1).
    pub min_trigger_count: u32,

    /// Upper bound of the countdown.
    pub max_trigger_count: u32,

    /// Chance of answering when the bot is mentioned (0.0 - 1.0).
    pub mention_probability: f64,

    /// Debug override that makes every message due.
    pub force_trigger: bool,

    /// Channels tracked before the least recently used is evicted.
    pub max_channels: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_trigger_count: 2,
            max_trigger_count: 8,
            mention_probability: 1.0,
            force_trigger: false,
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}

impl TriggerConfig {
    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.min_trigger_count < 1 {
            return Err(QueueError::InvalidConfig(
                "min_trigger_count must be at least 1".into(),
            ));
        }
        if self.min_trigger_count > self.max_trigger_count {
            return Err(QueueError::InvalidConfig(format!(
                "min_trigger_count {} exceeds max_trigger_count {}",
                self.min_trigger_count, self.max_trigger_count
            )));
        }
        if !(0.0..=1.0).contains(&self.mention_probability) {
            return Err(QueueError::InvalidConfig(format!(
                "mention_probability {} is outside 0.0..=1.0",
                self.mention_probability
            )));
        }
        if self.max_channels == 0 {
            return Err(QueueError::InvalidConfig("max_channels must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_are_valid() {
        QueueConfig::default().validate().unwrap();
        TriggerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_trigger_bounds_rejected() {
        let config = TriggerConfig {
            min_trigger_count: 5,
            max_trigger_count: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TriggerConfig {
            min_trigger_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TriggerConfig {
            mention_probability: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_self_report_rejected() {
        let config = QueueConfig {
            self_report_marks: HashSet::from([Mark::Unknown]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_slots() {
        let slots = QueueConfig::parse_slots(" a, b ;c;; ,");
        assert_eq!(
            slots,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()]
            ]
        );
    }

    #[test]
    fn test_slot_for() {
        let config = QueueConfig {
            slots: vec![vec!["a".into(), "b".into()]],
            ..Default::default()
        };
        assert_eq!(config.slot_for("b").map(|s| s.len()), Some(2));
        assert!(config.slot_for("z").is_none());
    }
}
