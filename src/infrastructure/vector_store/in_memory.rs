use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{ports::VectorStore, Embedding, KnowledgeChunk, PipelineError, ScoredChunk};

/// Cosine-similarity store kept in process memory. Used by tests and
/// single-process deployments without a Qdrant instance.
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<(KnowledgeChunk, Embedding)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        chunk: &KnowledgeChunk,
        embedding: &Embedding,
    ) -> Result<(), PipelineError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| PipelineError::internal(e.to_string()))?;

        store.retain(|(c, _)| c.id != chunk.id);
        store.push((chunk.clone(), embedding.clone()));
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let store = self
            .chunks
            .read()
            .map_err(|e| PipelineError::internal(e.to_string()))?;

        let mut results: Vec<ScoredChunk> = store
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        // Descending by score; ties keep insertion order (stable sort).
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results.into_iter().take(top_k).collect())
    }

    async fn clear(&self) -> Result<(), PipelineError> {
        let mut store = self
            .chunks
            .write()
            .map_err(|e| PipelineError::internal(e.to_string()))?;
        store.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new();

        let chunk = KnowledgeChunk::new("Employees accrue 15 PTO days/year.");
        let embedding = Embedding::new(vec![1.0, 0.0, 0.0]);
        store.upsert(&chunk, &embedding).await.unwrap();

        let results = store
            .search(&Embedding::new(vec![1.0, 0.0, 0.0]), 1)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_chunk_id() {
        let store = InMemoryVectorStore::new();
        let chunk = KnowledgeChunk::new("original");

        store
            .upsert(&chunk, &Embedding::new(vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(&chunk, &Embedding::new(vec![0.0, 1.0]))
            .await
            .unwrap();

        let results = store
            .search(&Embedding::new(vec![0.0, 1.0]), 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_orders_by_descending_score() {
        let store = InMemoryVectorStore::new();

        let close = KnowledgeChunk::new("close match");
        let far = KnowledgeChunk::new("far match");
        store
            .upsert(&far, &Embedding::new(vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .upsert(&close, &Embedding::new(vec![1.0, 0.1]))
            .await
            .unwrap();

        let results = store
            .search(&Embedding::new(vec![1.0, 0.0]), 2)
            .await
            .unwrap();

        assert_eq!(results[0].chunk.text, "close match");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&KnowledgeChunk::new("entry"), &Embedding::new(vec![1.0]))
            .await
            .unwrap();

        store.clear().await.unwrap();

        let results = store.search(&Embedding::new(vec![1.0]), 10).await.unwrap();
        assert!(results.is_empty());
    }
}
