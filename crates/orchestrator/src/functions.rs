//! Memory functions a model can call mid-turn.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{ChatMessage, FunctionCall, FunctionExecutor, FunctionResult, MemoryStore};
use chat_queue::QueueManager;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

/// Results returned by the search functions when no limit is given.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Core memory section used when a call names none.
const DEFAULT_CORE_SECTION: &str = "human";

/// Every function [`MemoryFunctions`] understands.
pub const FUNCTION_NAMES: &[&str] = &[
    "archival_memory_insert",
    "archival_memory_search",
    "core_memory_append",
    "core_memory_replace",
    "conversation_search",
    "conversation_search_date",
];

/// Executes the fixed memory function registry.
pub struct MemoryFunctions {
    memory: Arc<dyn MemoryStore>,
    queue: Arc<QueueManager>,
    page_size: usize,
}

impl MemoryFunctions {
    /// Create an executor over a memory store and the message queue.
    pub fn new(memory: Arc<dyn MemoryStore>, queue: Arc<QueueManager>) -> Self {
        Self {
            memory,
            queue,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    async fn archival_insert(&self, call: &FunctionCall, channel_id: &str) -> Result<String, String> {
        let content = call.require_string("content")?;
        self.memory
            .insert_archival(channel_id, content)
            .await
            .map_err(|e| e.to_string())?;
        Ok("Inserted into archival memory.".to_string())
    }

    async fn archival_search(&self, call: &FunctionCall) -> Result<String, String> {
        let query = call.require_string("query")?;
        let limit = call.get_usize("limit").unwrap_or(self.page_size);
        let passages = self
            .memory
            .search_archival(query, limit)
            .await
            .map_err(|e| e.to_string())?;
        if passages.is_empty() {
            return Ok("No results found.".to_string());
        }
        Ok(passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {}", i + 1, p.text))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn core_append(&self, call: &FunctionCall) -> Result<String, String> {
        let section = core_section(call);
        let content = call.require_string("content")?;
        self.memory
            .append_core(section, content)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Appended to core memory section `{section}`."))
    }

    async fn core_replace(&self, call: &FunctionCall) -> Result<String, String> {
        let section = core_section(call);
        let old = call.require_string("old_content")?;
        let new = call.require_string("new_content")?;
        self.memory
            .replace_core(section, old, new)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Replaced text in core memory section `{section}`."))
    }

    async fn conversation_search(&self, call: &FunctionCall, channel_id: &str) -> Result<String, String> {
        let query = call.require_string("query")?;
        let limit = call.get_usize("limit").unwrap_or(self.page_size);
        let hits = self
            .queue
            .search_text(channel_id, query, limit)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format_messages(&hits))
    }

    async fn conversation_search_date(
        &self,
        call: &FunctionCall,
        channel_id: &str,
    ) -> Result<String, String> {
        let from = parse_date_bound(call.require_string("start_date")?, false)?;
        let to = parse_date_bound(call.require_string("end_date")?, true)?;
        if from > to {
            return Err("start_date is after end_date".to_string());
        }
        let limit = call.get_usize("limit").unwrap_or(self.page_size);
        let hits = self
            .queue
            .search_range(channel_id, from, to, limit)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format_messages(&hits))
    }
}

#[async_trait]
impl FunctionExecutor for MemoryFunctions {
    async fn execute(&self, call: &FunctionCall, channel_id: &str) -> FunctionResult {
        debug!(function = %call.name, channel = %channel_id, "executing function");
        let result = match call.name.as_str() {
            "archival_memory_insert" => self.archival_insert(call, channel_id).await,
            "archival_memory_search" => self.archival_search(call).await,
            "core_memory_append" => self.core_append(call).await,
            "core_memory_replace" => self.core_replace(call).await,
            "conversation_search" => self.conversation_search(call, channel_id).await,
            "conversation_search_date" => self.conversation_search_date(call, channel_id).await,
            other => Err(format!("Unknown function: {other}")),
        };
        match result {
            Ok(content) => FunctionResult::success(&call.name, content),
            Err(error) => {
                warn!(function = %call.name, error = %error, "function failed");
                FunctionResult::error(&call.name, error)
            }
        }
    }

    fn supported_functions(&self) -> Vec<&str> {
        FUNCTION_NAMES.to_vec()
    }
}

fn core_section(call: &FunctionCall) -> &str {
    call.get_string("section")
        .or_else(|| call.get_string("name"))
        .unwrap_or(DEFAULT_CORE_SECTION)
}

/// Milliseconds for a date bound. A bare date covers the whole day.
fn parse_date_bound(value: &str, end_of_day: bool) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{value}`, expected YYYY-MM-DD"))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc().timestamp_millis())
        .ok_or_else(|| format!("invalid date `{value}`"))
}

fn format_messages(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No messages found.".to_string();
    }
    messages
        .iter()
        .map(|m| {
            let when = DateTime::from_timestamp_millis(m.timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| m.timestamp.to_string());
            format!("[{when}] {}: {}", m.sender_name, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::InMemoryMemory;
    use chat_queue::QueueConfig;
    use serde_json::json;

    // 2024-01-01T12:00:00Z
    const NOON: i64 = 1_704_110_400_000;

    fn call(value: serde_json::Value) -> FunctionCall {
        serde_json::from_value(value).unwrap()
    }

    async fn functions() -> MemoryFunctions {
        let queue = Arc::new(QueueManager::in_memory(QueueConfig::default()).unwrap());
        for (i, text) in ["I like cats", "dogs are fine", "cats again"].iter().enumerate() {
            let mut msg = ChatMessage::new(format!("m{i}"), "g1", "u1", *text, NOON + i as i64)
                .with_sender_name("Alice");
            queue.enqueue(&mut msg).await.unwrap();
        }
        MemoryFunctions::new(Arc::new(InMemoryMemory::default()), queue)
    }

    #[tokio::test]
    async fn test_archival_round_trip() {
        let f = functions().await;
        let inserted = f
            .execute(
                &call(json!({"name": "archival_memory_insert", "params": {"content": "Alice owns a cat"}})),
                "g1",
            )
            .await;
        assert!(inserted.success);

        let found = f
            .execute(
                &call(json!({"name": "archival_memory_search", "params": {"query": "cat"}})),
                "g1",
            )
            .await;
        assert!(found.success);
        assert_eq!(found.content, "1. Alice owns a cat");
    }

    #[tokio::test]
    async fn test_conversation_search() {
        let f = functions().await;
        let result = f
            .execute(
                &call(json!({"name": "conversation_search", "params": {"query": "CATS"}})),
                "g1",
            )
            .await;
        assert!(result.success);
        assert_eq!(
            result.content,
            "[2024-01-01 12:00] Alice: I like cats\n[2024-01-01 12:00] Alice: cats again"
        );
    }

    #[tokio::test]
    async fn test_conversation_search_date() {
        let f = functions().await;
        let hit = f
            .execute(
                &call(json!({"name": "conversation_search_date",
                    "params": {"start_date": "2024-01-01", "end_date": "2024-01-01"}})),
                "g1",
            )
            .await;
        assert!(hit.success);
        assert_eq!(hit.content.lines().count(), 3);

        let miss = f
            .execute(
                &call(json!({"name": "conversation_search_date",
                    "params": {"start_date": "2024-01-02", "end_date": "2024-01-03"}})),
                "g1",
            )
            .await;
        assert_eq!(miss.content, "No messages found.");
    }

    #[tokio::test]
    async fn test_bad_date_is_error_result() {
        let f = functions().await;
        let result = f
            .execute(
                &call(json!({"name": "conversation_search_date",
                    "params": {"start_date": "yesterday", "end_date": "2024-01-01"}})),
                "g1",
            )
            .await;
        assert!(!result.success);
        assert!(result.content.contains("invalid date"));
    }

    #[tokio::test]
    async fn test_unknown_function_is_error_result() {
        let f = functions().await;
        let result = f.execute(&call(json!({"name": "launch_rockets"})), "g1").await;
        assert!(!result.success);
        assert_eq!(result.content, "Error: Unknown function: launch_rockets");
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let f = functions().await;
        let result = f.execute(&call(json!({"name": "core_memory_append"})), "g1").await;
        assert!(!result.success);
        assert!(result.content.contains("content"));
    }

    #[test]
    fn test_date_bounds() {
        assert_eq!(parse_date_bound("2024-01-01", false), Ok(1_704_067_200_000));
        assert_eq!(parse_date_bound("2024-01-01", true), Ok(1_704_153_599_999));
        assert_eq!(
            parse_date_bound("2024-01-01T12:00:00Z", true),
            Ok(NOON)
        );
    }

    #[test]
    fn test_supported_functions() {
        let queue = Arc::new(QueueManager::in_memory(QueueConfig::default()).unwrap());
        let f = MemoryFunctions::new(Arc::new(InMemoryMemory::default()), queue);
        assert_eq!(f.supported_functions().len(), FUNCTION_NAMES.len());
    }
}
