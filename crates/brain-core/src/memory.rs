//! Long-term memory contracts used by the memory functions.
//!
//! Archival memory is an append-only list of passages searched by text.
//! Core memory is a small set of named sections the model edits in place.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::BrainError;

/// Default maximum number of archival passages kept in memory.
const DEFAULT_MAX_PASSAGES: usize = 10_000;

/// A stored archival passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// Channel the passage was written from.
    pub channel_id: String,
    /// Passage text.
    pub text: String,
}

/// Storage for archival and core memory.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Append an archival passage.
    async fn insert_archival(&self, channel_id: &str, text: &str) -> Result<(), BrainError>;

    /// Search archival passages, best matches first.
    async fn search_archival(&self, query: &str, limit: usize) -> Result<Vec<Passage>, BrainError>;

    /// Append text to a core memory section, creating it if needed.
    async fn append_core(&self, section: &str, text: &str) -> Result<(), BrainError>;

    /// Replace `old` with `new` inside a core memory section.
    async fn replace_core(&self, section: &str, old: &str, new: &str) -> Result<(), BrainError>;

    /// All core memory sections in insertion order.
    async fn core_sections(&self) -> Result<Vec<(String, String)>, BrainError>;
}

/// Process-local [`MemoryStore`].
#[derive(Debug)]
pub struct InMemoryMemory {
    passages: RwLock<Vec<Passage>>,
    core: RwLock<IndexMap<String, String>>,
    max_passages: usize,
}

impl Default for InMemoryMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSAGES)
    }
}

impl InMemoryMemory {
    /// Create a store that keeps at most `max_passages` archival passages.
    pub fn new(max_passages: usize) -> Self {
        Self {
            passages: RwLock::new(Vec::new()),
            core: RwLock::new(IndexMap::new()),
            max_passages,
        }
    }
}

/// Number of lowercase query words found in `text`.
fn score(text: &str, words: &[String]) -> usize {
    let haystack = text.to_lowercase();
    words.iter().filter(|w| haystack.contains(w.as_str())).count()
}

#[async_trait]
impl MemoryStore for InMemoryMemory {
    async fn insert_archival(&self, channel_id: &str, text: &str) -> Result<(), BrainError> {
        if text.trim().is_empty() {
            return Err(BrainError::Memory("cannot archive empty text".to_string()));
        }
        let mut passages = self.passages.write().await;
        passages.push(Passage {
            channel_id: channel_id.to_string(),
            text: text.trim().to_string(),
        });
        if passages.len() > self.max_passages {
            let overflow = passages.len() - self.max_passages;
            passages.drain(0..overflow);
        }
        Ok(())
    }

    async fn search_archival(&self, query: &str, limit: usize) -> Result<Vec<Passage>, BrainError> {
        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let passages = self.passages.read().await;
        let mut scored: Vec<(usize, usize, &Passage)> = passages
            .iter()
            .enumerate()
            .map(|(i, p)| (score(&p.text, &words), i, p))
            .filter(|(s, _, _)| *s > 0)
            .collect();
        // Higher score first, newer first on ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, _, p)| p.clone())
            .collect())
    }

    async fn append_core(&self, section: &str, text: &str) -> Result<(), BrainError> {
        let mut core = self.core.write().await;
        let entry = core.entry(section.to_string()).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(text);
        Ok(())
    }

    async fn replace_core(&self, section: &str, old: &str, new: &str) -> Result<(), BrainError> {
        let mut core = self.core.write().await;
        let entry = core
            .get_mut(section)
            .ok_or_else(|| BrainError::Memory(format!("no core memory section '{}'", section)))?;
        if old.is_empty() || !entry.contains(old) {
            return Err(BrainError::Memory(format!(
                "text not found in section '{}'",
                section
            )));
        }
        *entry = entry.replace(old, new);
        Ok(())
    }

    async fn core_sections(&self) -> Result<Vec<(String, String)>, BrainError> {
        let core = self.core.read().await;
        Ok(core.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_archival_search_ranks_by_overlap() {
        let memory = InMemoryMemory::default();
        memory.insert_archival("g", "Alice likes green tea").await.unwrap();
        memory.insert_archival("g", "Bob likes coffee").await.unwrap();
        memory.insert_archival("g", "green tea and coffee both").await.unwrap();

        let hits = memory.search_archival("green coffee", 5).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "green tea and coffee both");
    }

    #[tokio::test]
    async fn test_archival_capacity() {
        let memory = InMemoryMemory::new(2);
        memory.insert_archival("g", "one").await.unwrap();
        memory.insert_archival("g", "two").await.unwrap();
        memory.insert_archival("g", "three").await.unwrap();

        assert!(memory.search_archival("one", 5).await.unwrap().is_empty());
        assert_eq!(memory.search_archival("three", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_archival_rejected() {
        let memory = InMemoryMemory::default();
        assert!(memory.insert_archival("g", "   ").await.is_err());
    }

    #[tokio::test]
    async fn test_core_append_and_replace() {
        let memory = InMemoryMemory::default();
        memory.append_core("persona", "I am cheerful").await.unwrap();
        memory.append_core("persona", "I like cats").await.unwrap();
        memory
            .replace_core("persona", "cats", "dogs")
            .await
            .unwrap();

        let sections = memory.core_sections().await.unwrap();
        assert_eq!(sections[0].1, "I am cheerful\nI like dogs");
        assert!(memory.replace_core("persona", "birds", "x").await.is_err());
        assert!(memory.replace_core("human", "a", "b").await.is_err());
    }
}
