//! `[emoji:NAME]` resolution.
//!
//! Each token is looked up by exact name, then through a [`NameSimilarity`]
//! service, then falls back to a configured id. All lookups of one reply run
//! concurrently and the text is rewritten once every lookup is done.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use brain_core::Segment;
use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use crate::error::OrchestratorError;

/// Opening of an emoji token.
const TOKEN_OPEN: &str = "[emoji:";

/// Default minimum similarity for a near match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// A named custom emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiEntry {
    /// Name the model refers to.
    pub name: String,
    /// Host emoji id.
    pub id: String,
}

/// The emoji a bot may use.
#[derive(Debug, Clone, Default)]
pub struct EmojiTable {
    entries: Vec<EmojiEntry>,
}

impl EmojiTable {
    /// Create a table from `(name, id)` pairs.
    pub fn new<N, I>(entries: impl IntoIterator<Item = (N, I)>) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, id)| EmojiEntry {
                    name: name.into(),
                    id: id.into(),
                })
                .collect(),
        }
    }

    /// Parse a table from JSON.
    ///
    /// Accepts an object of `name: id` pairs or an array of
    /// `{"name": .., "id": ..}` objects. Numeric ids are kept as text.
    pub fn from_json(json: &str) -> Result<Self, OrchestratorError> {
        let invalid = |detail: String| OrchestratorError::Configuration(format!("emoji table: {detail}"));
        let id_text = |name: &str, id: &Value| match id {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(invalid(format!("id of `{name}` is not a string or number: {other}"))),
        };

        let value: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        let entries = match &value {
            Value::Object(map) => map
                .iter()
                .map(|(name, id)| Ok((name.clone(), id_text(name, id)?)))
                .collect::<Result<Vec<_>, OrchestratorError>>()?,
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    let name = item
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid(format!("entry without a name: {item}")))?;
                    let id = item
                        .get("id")
                        .ok_or_else(|| invalid(format!("entry `{name}` has no id")))?;
                    Ok((name.to_string(), id_text(name, id)?))
                })
                .collect::<Result<Vec<_>, OrchestratorError>>()?,
            other => return Err(invalid(format!("expected an object or array, got {other}"))),
        };
        Ok(Self::new(entries))
    }

    /// Entry whose name equals `name`.
    pub fn exact(&self, name: &str) -> Option<&EmojiEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Entry at an index returned by [`NameSimilarity::nearest`].
    pub fn get(&self, index: usize) -> Option<&EmojiEntry> {
        self.entries.get(index)
    }

    /// All names, in table order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Finds the candidate closest to a query.
#[async_trait]
pub trait NameSimilarity: Send + Sync {
    /// Index of the nearest candidate, or `None` if nothing is close enough.
    async fn nearest(&self, query: &str, candidates: &[String]) -> Option<usize>;
}

/// Dice coefficient over lowercase character bigrams.
#[derive(Debug, Clone, Copy)]
pub struct BigramSimilarity {
    threshold: f64,
}

impl Default for BigramSimilarity {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl BigramSimilarity {
    /// Create a matcher that rejects scores below `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Similarity in `[0, 1]`.
    pub fn score(a: &str, b: &str) -> f64 {
        let a = bigrams(a);
        let b = bigrams(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let shared = a.intersection(&b).count();
        (2 * shared) as f64 / (a.len() + b.len()) as f64
    }
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.to_lowercase().chars().collect();
    if chars.len() == 1 {
        return HashSet::from([(chars[0], chars[0])]);
    }
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

#[async_trait]
impl NameSimilarity for BigramSimilarity {
    async fn nearest(&self, query: &str, candidates: &[String]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let score = Self::score(query, candidate);
            if score >= self.threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Resolves emoji tokens against a table.
#[derive(Clone)]
pub struct EmojiResolver {
    table: Arc<EmojiTable>,
    similarity: Arc<dyn NameSimilarity>,
    fallback_id: String,
}

impl EmojiResolver {
    /// Create a resolver with the bigram matcher.
    pub fn new(table: EmojiTable, fallback_id: impl Into<String>) -> Self {
        Self {
            table: Arc::new(table),
            similarity: Arc::new(BigramSimilarity::default()),
            fallback_id: fallback_id.into(),
        }
    }

    /// Replace the similarity service.
    pub fn with_similarity(mut self, similarity: Arc<dyn NameSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Resolve one name to an emoji segment.
    pub async fn resolve(&self, name: &str) -> Segment {
        let id = if let Some(entry) = self.table.exact(name) {
            entry.id.clone()
        } else {
            let names = self.table.names();
            match self.similarity.nearest(name, &names).await.and_then(|i| self.table.get(i)) {
                Some(entry) => {
                    debug!(requested = %name, matched = %entry.name, "emoji near match");
                    entry.id.clone()
                }
                None => {
                    debug!(requested = %name, "emoji fallback");
                    self.fallback_id.clone()
                }
            }
        };
        Segment::Emoji {
            id,
            name: name.to_string(),
        }
    }

    /// Replace emoji tokens inside text segments.
    pub async fn substitute(&self, segments: Vec<Segment>) -> Vec<Segment> {
        let split: Vec<Vec<Piece>> = segments.into_iter().map(split_tokens).collect();

        let names: Vec<&str> = split
            .iter()
            .flatten()
            .filter_map(|p| match p {
                Piece::Token(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        let mut resolved = join_all(names.iter().map(|n| self.resolve(n)))
            .await
            .into_iter();

        let mut out = Vec::new();
        for piece in split.into_iter().flatten() {
            match piece {
                Piece::Keep(segment) => out.push(segment),
                Piece::Token(name) => out.push(
                    resolved
                        .next()
                        .unwrap_or_else(|| Segment::text(format!("{TOKEN_OPEN}{name}]"))),
                ),
            }
        }
        out
    }
}

enum Piece {
    Keep(Segment),
    Token(String),
}

fn split_tokens(segment: Segment) -> Vec<Piece> {
    let Segment::Text(text) = segment else {
        return vec![Piece::Keep(segment)];
    };
    let mut pieces = Vec::new();
    let mut rest = text.as_str();
    while let Some(start) = rest.find(TOKEN_OPEN) {
        let body = &rest[start + TOKEN_OPEN.len()..];
        let Some(end) = body.find(']') else { break };
        let name = body[..end].trim();
        if name.is_empty() || name.contains('[') {
            // Not a token; keep the opening bracket as text and move on.
            pieces.push(Piece::Keep(Segment::text(&rest[..start + 1])));
            rest = &rest[start + 1..];
            continue;
        }
        if start > 0 {
            pieces.push(Piece::Keep(Segment::text(&rest[..start])));
        }
        pieces.push(Piece::Token(name.to_string()));
        rest = &body[end + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Keep(Segment::text(rest)));
    }
    pieces
}
