use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable unit of retrievable content. Created at index-build time,
/// never mutated, discarded only when the index is rebuilt from source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: Uuid,
    pub text: String,
    pub tags: BTreeMap<String, String>,
}

impl KnowledgeChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }
}

/// One entry of a retrieval result: a chunk and its relevance score.
///
/// A retrieval result is an ordered `Vec<ScoredChunk>`, descending by score,
/// at most `top_k` long and free of duplicate chunk ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Splits source text into chunk-sized pieces along paragraph boundaries.
///
/// Paragraphs are joined until the next one would exceed `max_len`, then a
/// new piece starts. A single oversized paragraph becomes its own piece.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut pieces = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let would_exceed =
            !current.is_empty() && current.len() + paragraph.len() + 2 > max_len;

        if would_exceed {
            pieces.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
