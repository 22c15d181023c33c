use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::domain::{chunk_text, KnowledgeChunk};

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub entries: Vec<IngestEntry>,
}

#[derive(Debug, Deserialize)]
pub struct IngestEntry {
    pub text: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub chunks_indexed: usize,
}

/// Splits each entry along paragraph boundaries and indexes the pieces,
/// carrying the entry's tags onto every chunk.
pub async fn ingest_knowledge(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, StatusCode> {
    let chunk_size = state.config.rag.chunk_size;

    let chunks: Vec<KnowledgeChunk> = request
        .entries
        .into_iter()
        .flat_map(|entry| {
            chunk_text(&entry.text, chunk_size)
                .into_iter()
                .map(move |piece| KnowledgeChunk::new(piece).with_tags(entry.tags.clone()))
        })
        .collect();

    state.index.index_chunks(&chunks).await.map_err(|e| {
        tracing::error!(error = %e, "knowledge ingestion failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(IngestResponse {
        chunks_indexed: chunks.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultResponse {
    pub chunk_id: Uuid,
    pub text: String,
    pub tags: BTreeMap<String, String>,
    pub score: f32,
}

pub async fn search_knowledge(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<Vec<SearchResultResponse>> {
    let top_k = request.top_k.unwrap_or(state.config.rag.top_k);
    let results = state.index.search(&request.query, top_k).await;

    Json(
        results
            .into_iter()
            .map(|r| SearchResultResponse {
                chunk_id: r.chunk.id,
                text: r.chunk.text,
                tags: r.chunk.tags,
                score: r.score,
            })
            .collect(),
    )
}

pub async fn clear_knowledge(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    state.index.clear().await.map_err(|e| {
        tracing::error!(error = %e, "failed to clear knowledge index");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}
