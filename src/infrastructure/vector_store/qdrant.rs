use std::collections::BTreeMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{ports::VectorStore, Embedding, KnowledgeChunk, PipelineError, ScoredChunk};

/// Qdrant-backed chunk store. The collection is created on first use with
/// cosine distance at the configured dimension.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, PipelineError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), PipelineError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| PipelineError::retrieval(e.to_string()))?;
        }

        Ok(())
    }

    fn chunk_point_id(id: Uuid) -> u64 {
        let bytes = id.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(
        &self,
        chunk: &KnowledgeChunk,
        embedding: &Embedding,
    ) -> Result<(), PipelineError> {
        let tags_json = serde_json::to_string(&chunk.tags)
            .map_err(|e| PipelineError::internal(e.to_string()))?;

        let payload: Payload = serde_json::json!({
            "chunk_id": chunk.id.to_string(),
            "text": chunk.text,
            "tags": tags_json,
        })
        .try_into()
        .map_err(|_| PipelineError::internal("failed to create payload"))?;

        let point = PointStruct::new(
            Self::chunk_point_id(chunk.id),
            embedding.as_slice().to_vec(),
            payload,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        let scored: Vec<ScoredChunk> = results
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload;

                let id: Uuid = payload.get("chunk_id")?.as_str()?.parse().ok()?;
                let text = payload.get("text")?.as_str()?.to_string();
                let tags: BTreeMap<String, String> = payload
                    .get("tags")
                    .and_then(|v| v.as_str())
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default();

                Some(ScoredChunk {
                    chunk: KnowledgeChunk { id, text, tags },
                    score: point.score,
                })
            })
            .collect();

        Ok(scored)
    }

    async fn clear(&self) -> Result<(), PipelineError> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| PipelineError::retrieval(e.to_string()))?;

        self.ensure_collection().await
    }
}
