use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::KnowledgeChunk;

/// The outcome of one respond cycle. Ephemeral: exists only for the duration
/// of one request/response. `source_chunks` is always a subset of the
/// retrieval result the answer was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    pub source_chunks: Vec<KnowledgeChunk>,
}

impl GeneratedAnswer {
    pub fn new(text: impl Into<String>, source_chunks: Vec<KnowledgeChunk>) -> Self {
        Self {
            text: text.into(),
            source_chunks,
        }
    }
}

/// Proof of a completed delivery, reported separately from generation so a
/// delivery fault never discards the generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub channel: String,
    pub detail: String,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryReceipt {
    pub fn new(channel: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            detail: detail.into(),
            delivered_at: Utc::now(),
        }
    }
}
