use std::collections::HashSet;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    KnowledgeChunk, PipelineError, ScoredChunk,
};

/// Embedding-backed similarity search over the indexed chunk set.
///
/// Search never fails: any embedding or store fault is downgraded to an
/// empty result with a warning, so callers treat "no context found" as a
/// valid non-error outcome.
pub struct KnowledgeIndex {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl KnowledgeIndex {
    pub fn new(embedding: Arc<dyn EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedding, store }
    }

    /// Returns at most `top_k` chunks in descending relevance order, with
    /// duplicate chunk ids removed. Ties keep the underlying store's order.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<ScoredChunk> {
        if top_k == 0 {
            return Vec::new();
        }

        let embedding = match self.embedding.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed, returning empty context");
                return Vec::new();
            }
        };

        let results = match self.store.search(&embedding, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "vector search failed, returning empty context");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        results
            .into_iter()
            .filter(|r| seen.insert(r.chunk.id))
            .take(top_k)
            .collect()
    }

    #[instrument(skip(self, chunk), fields(chunk_id = %chunk.id))]
    pub async fn index_chunk(&self, chunk: &KnowledgeChunk) -> Result<(), PipelineError> {
        let embedding = self.embedding.embed(&chunk.text).await?;
        self.store.upsert(chunk, &embedding).await
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[KnowledgeChunk]) -> Result<(), PipelineError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.store.upsert(chunk, embedding).await?;
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), PipelineError> {
        self.store.clear().await
    }
}
