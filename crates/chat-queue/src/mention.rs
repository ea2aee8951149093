//! Detects whether an inbound message addresses the bot.

use brain_core::markup::find_elements;

/// How the bot was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// `<at id="BOT"/>`
    Direct,
    /// `<at type="all"/>`
    Everyone,
    /// `<at type="here"/>`, only counted while the bot is online.
    Here,
}

/// Scans message markup for mentions of one bot.
#[derive(Debug, Clone)]
pub struct MentionDetector {
    bot_id: String,
}

impl MentionDetector {
    /// Create a detector for the given bot member id.
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
        }
    }

    /// The first mention that addresses the bot.
    ///
    /// "here" only reaches members that are online, so it is ignored while
    /// the bot's own presence is reported offline.
    pub fn detect(&self, content: &str, bot_online: bool) -> Option<MentionKind> {
        find_elements(content, "at").into_iter().find_map(|el| {
            if !self.bot_id.is_empty() && el.attr("id") == Some(self.bot_id.as_str()) {
                return Some(MentionKind::Direct);
            }
            match el.attr("type") {
                Some("all") => Some(MentionKind::Everyone),
                Some("here") if bot_online => Some(MentionKind::Here),
                _ => None,
            }
        })
    }
}
