//! Prompt assembly from a message window.

use brain_core::{ChatMessage, Mark, Role, Turn};
use chrono::DateTime;

use crate::directory::Member;

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a member of a group chat. Read the conversation and decide whether to speak.

Always answer with exactly one JSON object and nothing else:

- Reply: {"status": "success", "finalReply": "<text>", "select": <message id to quote or -1>, "nextReplyIn": <messages to wait>, "logic": "<why>"}
- Stay quiet: {"status": "skip", "nextReplyIn": <messages to wait>, "logic": "<why>"}
- Use memory first: {"status": "function", "functions": [{"name": "<function>", "params": {...}}]}

Mention members with @Name, everyone with @everyone. Use custom emoji as [emoji:name].
Memory functions: archival_memory_insert(content), archival_memory_search(query), core_memory_append(section, content), core_memory_replace(section, old_content, new_content), conversation_search(query), conversation_search_date(start_date, end_date)."#;

/// Facts about the turn a prompt builder may use.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Channel being answered.
    pub channel_id: &'a str,
    /// The bot's own member id.
    pub bot_id: &'a str,
    /// Members of the channel.
    pub members: &'a [Member],
    /// Core memory sections as `(name, text)`.
    pub core_memory: &'a [(String, String)],
    /// Current time in milliseconds.
    pub now: i64,
}

/// A system prompt plus the conversation turns for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// System prompt.
    pub system: String,
    /// Conversation, oldest first.
    pub turns: Vec<Turn>,
}

/// Builds the model input from a window.
pub trait PromptBuilder: Send + Sync {
    /// Build a prompt.
    fn build(&self, system_prompt: &str, window: &[ChatMessage], ctx: &PromptContext<'_>) -> Prompt;
}

/// Renders the window as a transcript.
///
/// Runs of other members' messages become one user turn of
/// `[id] name: content` lines. The bot's own messages become assistant
/// turns, so the model sees what it already said. When the window spans
/// several channels, as slot windows do, each line starts with
/// `#channel` so the model can tell where a message was said.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptPrompt;

impl TranscriptPrompt {
    fn system(&self, system_prompt: &str, ctx: &PromptContext<'_>) -> String {
        let mut system = String::from(system_prompt);

        system.push_str("\n\n[CHANNEL]\n");
        system.push_str(ctx.channel_id);
        if let Some(now) = DateTime::from_timestamp_millis(ctx.now) {
            system.push_str(&format!("\nCurrent time: {}", now.format("%Y-%m-%d %H:%M UTC")));
        }

        if !ctx.members.is_empty() {
            system.push_str("\n\n[MEMBERS]\n");
            let lines: Vec<String> = ctx
                .members
                .iter()
                .map(|m| format!("{} ({})", m.display_name, m.member_id))
                .collect();
            system.push_str(&lines.join("\n"));
        }

        for (name, text) in ctx.core_memory {
            system.push_str(&format!("\n\n[CORE MEMORY: {name}]\n{text}"));
        }
        system
    }
}

impl PromptBuilder for TranscriptPrompt {
    fn build(&self, system_prompt: &str, window: &[ChatMessage], ctx: &PromptContext<'_>) -> Prompt {
        let mut turns: Vec<Turn> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let labelled = window
            .first()
            .is_some_and(|first| window.iter().any(|m| m.channel_id != first.channel_id));

        for message in window {
            let own = message.mark == Mark::Llm || message.sender_id == ctx.bot_id;
            if own {
                if !pending.is_empty() {
                    turns.push(Turn::user(pending.join("\n")));
                    pending.clear();
                }
                turns.push(Turn::assistant(message.content.clone()));
            } else {
                let line = format!("[{}] {}: {}", message.id, message.sender_name, message.content);
                pending.push(if labelled {
                    format!("#{} {line}", message.channel_id)
                } else {
                    line
                });
            }
        }
        if !pending.is_empty() {
            turns.push(Turn::user(pending.join("\n")));
        }
        if turns.last().map_or(true, |t| t.role != Role::User) {
            turns.push(Turn::user("(no new messages)"));
        }

        Prompt {
            system: self.system(system_prompt, ctx),
            turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(members: &'a [Member], core: &'a [(String, String)]) -> PromptContext<'a> {
        PromptContext {
            channel_id: "g1",
            bot_id: "bot",
            members,
            core_memory: core,
            now: 1_704_110_400_000,
        }
    }

    #[test]
    fn test_transcript_groups_runs() {
        let window = vec![
            ChatMessage::new("1", "g1", "u1", "hi", 1).with_sender_name("Ann"),
            ChatMessage::new("2", "g1", "u2", "yo", 2).with_sender_name("Bob"),
            ChatMessage::new("3", "g1", "bot", "hello both", 3),
            ChatMessage::new("4", "g1", "u1", "how are you?", 4).with_sender_name("Ann"),
        ];
        let prompt = TranscriptPrompt.build("sys", &window, &ctx(&[], &[]));

        assert_eq!(prompt.turns.len(), 3);
        assert_eq!(prompt.turns[0].content, "[1] Ann: hi\n[2] Bob: yo");
        assert_eq!(prompt.turns[1].role, Role::Assistant);
        assert_eq!(prompt.turns[2].content, "[4] Ann: how are you?");
    }

    #[test]
    fn test_mixed_channel_window_is_labelled() {
        let window = vec![
            ChatMessage::new("1", "g1", "u1", "hi", 1).with_sender_name("Ann"),
            ChatMessage::new("2", "g2", "u2", "over here", 2).with_sender_name("Bob"),
        ];
        let prompt = TranscriptPrompt.build("sys", &window, &ctx(&[], &[]));

        assert_eq!(prompt.turns.len(), 1);
        assert_eq!(
            prompt.turns[0].content,
            "#g1 [1] Ann: hi\n#g2 [2] Bob: over here"
        );
    }

    #[test]
    fn test_self_report_mark_is_assistant() {
        let window = vec![ChatMessage::new("1", "g1", "relay", "said earlier", 1).with_mark(Mark::Llm)];
        let prompt = TranscriptPrompt.build("sys", &window, &ctx(&[], &[]));
        assert_eq!(prompt.turns[0].role, Role::Assistant);
        assert_eq!(prompt.turns.last().map(|t| t.role), Some(Role::User));
    }

    #[test]
    fn test_system_sections() {
        let members = vec![Member::new("Ann", "u1")];
        let core = vec![("human".to_string(), "Ann likes tea".to_string())];
        let prompt = TranscriptPrompt.build("sys", &[], &ctx(&members, &core));

        assert!(prompt.system.starts_with("sys\n\n[CHANNEL]\ng1"));
        assert!(prompt.system.contains("Current time: 2024-01-01 12:00 UTC"));
        assert!(prompt.system.contains("[MEMBERS]\nAnn (u1)"));
        assert!(prompt.system.contains("[CORE MEMORY: human]\nAnn likes tea"));
        assert_eq!(prompt.turns, vec![Turn::user("(no new messages)")]);
    }
}
