use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::routes::respond::RespondApiRequest;
use crate::api::state::AppState;
use crate::infrastructure::{BatchRespondJob, RespondJob};

#[derive(Debug, Serialize)]
pub struct JobQueuedResponse {
    pub job_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchJobRequest {
    pub requests: Vec<RespondApiRequest>,
}

pub async fn queue_respond(
    State(state): State<AppState>,
    Json(request): Json<RespondApiRequest>,
) -> Result<Json<JobQueuedResponse>, StatusCode> {
    let job = RespondJob::new(request.into());

    let job_id = state
        .job_producer
        .push_respond_job(&job)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to queue respond job");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(JobQueuedResponse {
        job_id,
        status: "queued".to_string(),
    }))
}

pub async fn queue_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchJobRequest>,
) -> Result<Json<JobQueuedResponse>, StatusCode> {
    let job = BatchRespondJob::new(request.requests.into_iter().map(Into::into).collect());

    let job_id = state.job_producer.push_batch_job(&job).await.map_err(|e| {
        tracing::error!(error = %e, "failed to queue batch job");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(JobQueuedResponse {
        job_id,
        status: "queued".to_string(),
    }))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, StatusCode> {
    let result = state
        .job_producer
        .get_job_status(&job_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to get job status");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match result {
        Some(job_result) => Ok(Json(JobStatusResponse {
            job_id: job_result.job_id,
            status: format!("{:?}", job_result.status).to_lowercase(),
            result: job_result.result,
            error: job_result.error,
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}
