//! Bot configuration.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use brain_core::Mark;
use chat_queue::{QueueConfig, TriggerConfig};
use llm_adapter::AdapterEntry;

use crate::error::OrchestratorError;
use crate::interpreter::EmojiTable;

/// Default system prompt file name.
pub const DEFAULT_PROMPT_FILE: &str = "SYSTEM_PROMPT.md";

/// Default bound on function-call rounds per turn.
pub const DEFAULT_FUNCTION_DEPTH: usize = 3;

/// Default emoji id used when no name matches.
pub const DEFAULT_EMOJI_FALLBACK_ID: &str = "0";

/// How strictly reply text is located in model output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyMode {
    /// Only `finalReply` is accepted.
    Strict,
    /// The first non-empty field of the accessor list is accepted.
    #[default]
    Lenient,
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        })
    }
}

impl FromStr for ReplyMode {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(OrchestratorError::Configuration(format!(
                "unknown reply mode: {other}"
            ))),
        }
    }
}

/// Configuration for the turn pipeline.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// The bot's own member id, used for mention detection.
    pub bot_id: String,

    /// Window and slot settings.
    pub queue: QueueConfig,

    /// Countdown and mention settings.
    pub trigger: TriggerConfig,

    /// Reply field strictness.
    pub reply_mode: ReplyMode,

    /// Function-call rounds allowed per turn.
    pub max_function_depth: usize,

    /// Channel that receives interpretation failures.
    pub diagnostics_channel: Option<String>,

    /// System prompt; `None` uses the built-in default.
    pub system_prompt: Option<String>,

    /// Emoji names the model may use and the ids they render to.
    pub emoji_table: EmojiTable,

    /// Emoji id used when a name resolves to nothing.
    pub emoji_fallback_id: String,

    /// Log raw model output at info level.
    pub debug_raw_output: bool,

    /// Backend roster in priority order.
    pub adapters: Vec<AdapterEntry>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_id: String::new(),
            queue: QueueConfig::default(),
            trigger: TriggerConfig::default(),
            reply_mode: ReplyMode::default(),
            max_function_depth: DEFAULT_FUNCTION_DEPTH,
            diagnostics_channel: None,
            system_prompt: None,
            emoji_table: EmojiTable::default(),
            emoji_fallback_id: DEFAULT_EMOJI_FALLBACK_ID.to_string(),
            debug_raw_output: false,
            adapters: Vec::new(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl BotConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `CHIME_BOT_ID` - The bot's member id
    /// - `CHIME_MIN_TRIGGER` / `CHIME_MAX_TRIGGER` - Countdown bounds (default: 2 / 8)
    /// - `CHIME_SLOT_SIZE` - Messages per window (default: 20)
    /// - `CHIME_SLOTS` - Channel groups, e.g. `a,b;c,d`
    /// - `CHIME_MENTION_PROBABILITY` - Chance of answering a mention (default: 1.0)
    /// - `CHIME_SELF_REPORT_MARKS` - Marks still recorded, e.g. `llm,command` (default: llm)
    /// - `CHIME_STRICT_REPLY` - Require `finalReply` (default: false)
    /// - `CHIME_CLEAR_COMMAND` - Clear-memory command (default: /clear-memory)
    /// - `CHIME_FUNCTION_DEPTH` - Function-call rounds per turn (default: 3)
    /// - `CHIME_DIAGNOSTICS_CHANNEL` - Channel mirroring interpretation failures
    /// - `CHIME_EMOJI_TABLE` - Path to a JSON emoji table, `{"name": "id"}`
    /// - `CHIME_EMOJI_FALLBACK` - Emoji id used when nothing matches (default: 0)
    /// - `CHIME_DEBUG_FORCE_TRIGGER` - Make every message due (default: false)
    /// - `CHIME_DEBUG_RAW` - Log raw model output (default: false)
    /// - `CHIME_SYSTEM_PROMPT` - System prompt (overrides prompt file)
    /// - `CHIME_PROMPT_FILE` - Path to system prompt file (default: SYSTEM_PROMPT.md)
    /// - `CHIME_ADAPTERS` - JSON array of adapter entries
    ///
    /// Unknown enumerated values (marks, adapter kinds) are configuration
    /// errors; unparsable numbers fall back to their defaults.
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let defaults = Self::default();

        let mut queue = QueueConfig {
            slot_size: env_parse("CHIME_SLOT_SIZE").unwrap_or(defaults.queue.slot_size),
            ..defaults.queue
        };
        if let Ok(slots) = env::var("CHIME_SLOTS") {
            queue.slots = QueueConfig::parse_slots(&slots);
        }
        if let Ok(command) = env::var("CHIME_CLEAR_COMMAND") {
            queue.clear_memory_command = command;
        }
        if let Ok(marks) = env::var("CHIME_SELF_REPORT_MARKS") {
            queue.self_report_marks = parse_marks(&marks)?;
        }

        let trigger = TriggerConfig {
            min_trigger_count: env_parse("CHIME_MIN_TRIGGER")
                .unwrap_or(defaults.trigger.min_trigger_count),
            max_trigger_count: env_parse("CHIME_MAX_TRIGGER")
                .unwrap_or(defaults.trigger.max_trigger_count),
            mention_probability: env_parse("CHIME_MENTION_PROBABILITY")
                .unwrap_or(defaults.trigger.mention_probability),
            force_trigger: env_flag("CHIME_DEBUG_FORCE_TRIGGER").unwrap_or(false),
            ..defaults.trigger
        };

        let reply_mode = if env_flag("CHIME_STRICT_REPLY").unwrap_or(false) {
            ReplyMode::Strict
        } else {
            ReplyMode::Lenient
        };

        // System prompt: env var takes precedence, then try loading from file
        let system_prompt = if let Ok(prompt) = env::var("CHIME_SYSTEM_PROMPT") {
            Some(prompt)
        } else {
            let prompt_file =
                env::var("CHIME_PROMPT_FILE").unwrap_or_else(|_| DEFAULT_PROMPT_FILE.to_string());
            load_prompt_file(&prompt_file)
        };

        let emoji_table = match env::var("CHIME_EMOJI_TABLE") {
            Ok(path) if !path.trim().is_empty() => load_emoji_table(path.trim())?,
            _ => EmojiTable::default(),
        };

        let adapters = AdapterEntry::roster_from_env()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;

        let config = Self {
            bot_id: env::var("CHIME_BOT_ID").unwrap_or_default(),
            queue,
            trigger,
            reply_mode,
            max_function_depth: env_parse("CHIME_FUNCTION_DEPTH")
                .unwrap_or(defaults.max_function_depth),
            diagnostics_channel: env::var("CHIME_DIAGNOSTICS_CHANNEL")
                .ok()
                .filter(|c| !c.trim().is_empty()),
            system_prompt,
            emoji_table,
            emoji_fallback_id: env::var("CHIME_EMOJI_FALLBACK")
                .unwrap_or(defaults.emoji_fallback_id),
            debug_raw_output: env_flag("CHIME_DEBUG_RAW").unwrap_or(false),
            adapters,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a new config builder.
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Check queue and trigger settings.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        self.queue
            .validate()
            .and_then(|_| self.trigger.validate())
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))
    }
}

/// Parse a comma-separated mark list.
fn parse_marks(value: &str) -> Result<HashSet<Mark>, OrchestratorError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| {
            Mark::parse(m)
                .ok_or_else(|| OrchestratorError::Configuration(format!("unknown mark: {m}")))
        })
        .collect()
}

/// Builder for BotConfig.
#[derive(Debug, Default)]
pub struct BotConfigBuilder {
    config: BotConfig,
}

impl BotConfigBuilder {
    /// Set the bot's member id.
    pub fn bot_id(mut self, id: impl Into<String>) -> Self {
        self.config.bot_id = id.into();
        self
    }

    /// Set the countdown bounds.
    pub fn trigger_range(mut self, min: u32, max: u32) -> Self {
        self.config.trigger.min_trigger_count = min;
        self.config.trigger.max_trigger_count = max;
        self
    }

    /// Set the chance of answering a mention.
    pub fn mention_probability(mut self, probability: f64) -> Self {
        self.config.trigger.mention_probability = probability;
        self
    }

    /// Make every message due.
    pub fn force_trigger(mut self, force: bool) -> Self {
        self.config.trigger.force_trigger = force;
        self
    }

    /// Set the window size.
    pub fn slot_size(mut self, size: usize) -> Self {
        self.config.queue.slot_size = size;
        self
    }

    /// Add a channel group.
    pub fn slot<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .queue
            .slots
            .push(channels.into_iter().map(Into::into).collect());
        self
    }

    /// Set the clear-memory command.
    pub fn clear_command(mut self, command: impl Into<String>) -> Self {
        self.config.queue.clear_memory_command = command.into();
        self
    }

    /// Set the reply mode.
    pub fn reply_mode(mut self, mode: ReplyMode) -> Self {
        self.config.reply_mode = mode;
        self
    }

    /// Set the function-call depth.
    pub fn max_function_depth(mut self, depth: usize) -> Self {
        self.config.max_function_depth = depth;
        self
    }

    /// Set the diagnostics channel.
    pub fn diagnostics_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.diagnostics_channel = Some(channel.into());
        self
    }

    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Set the emoji table.
    pub fn emoji_table(mut self, table: EmojiTable) -> Self {
        self.config.emoji_table = table;
        self
    }

    /// Load the emoji table from a JSON file.
    pub fn load_emoji_table(mut self, path: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        self.config.emoji_table = load_emoji_table(path)?;
        Ok(self)
    }

    /// Set the emoji fallback id.
    pub fn emoji_fallback_id(mut self, id: impl Into<String>) -> Self {
        self.config.emoji_fallback_id = id.into();
        self
    }

    /// Add a backend to the roster.
    pub fn adapter(mut self, entry: AdapterEntry) -> Self {
        self.config.adapters.push(entry);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> BotConfig {
        self.config
    }

    /// Load system prompt from a file.
    ///
    /// If the file exists and is non-empty, sets the system prompt.
    pub fn load_prompt_file(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(prompt) = load_prompt_file(path) {
            self.config.system_prompt = Some(prompt);
        }
        self
    }
}

/// Load a prompt file, returning None if not found or empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Read an emoji table file. A named file that cannot be read is an error.
fn load_emoji_table(path: impl AsRef<Path>) -> Result<EmojiTable, OrchestratorError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        OrchestratorError::Configuration(format!("emoji table {}: {e}", path.display()))
    })?;
    EmojiTable::from_json(&json)
}
