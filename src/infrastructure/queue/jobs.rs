use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::RespondRequest;

pub mod queues {
    pub const RESPOND_QUEUE: &str = "jobs:respond";
    pub const BATCH_QUEUE: &str = "jobs:respond_batch";
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{job_id}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResult {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Pending,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn processing(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Processing,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn completed(job_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Completed,
            result: Some(result),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Failed,
            result: None,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}

/// Answer one request asynchronously, delivering by email when the request
/// carries a recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondJob {
    pub job_id: Uuid,
    pub request: RespondRequest,
}

impl RespondJob {
    pub fn new(request: RespondRequest) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            request,
        }
    }
}

/// Answer a sequence of independent requests, preserving input order in the
/// recorded results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRespondJob {
    pub job_id: Uuid,
    pub requests: Vec<RespondRequest>,
}

impl BatchRespondJob {
    pub fn new(requests: Vec<RespondRequest>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            requests,
        }
    }
}
