use async_trait::async_trait;

use crate::domain::{errors::PipelineError, Embedding, KnowledgeChunk, ScoredChunk};

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &self,
        chunk: &KnowledgeChunk,
        embedding: &Embedding,
    ) -> Result<(), PipelineError>;

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError>;

    /// Drops every indexed chunk. Used when the index is rebuilt from source.
    async fn clear(&self) -> Result<(), PipelineError>;
}
