use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::state::AppState;
use crate::domain::{ports::DeliveryChannel, GeneratedAnswer, PipelineError, RespondRequest};

#[derive(Debug, Deserialize)]
pub struct RespondApiRequest {
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub query: String,
}

impl From<RespondApiRequest> for RespondRequest {
    fn from(req: RespondApiRequest) -> Self {
        Self {
            recipient: req.recipient,
            subject: req.subject,
            query: req.query,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RespondApiResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
}

/// Delivery is reported separately from generation so a failed send never
/// discards the generated text.
#[derive(Debug, Serialize)]
pub struct DeliveryOutcome {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn respond_handler(
    State(state): State<AppState>,
    Json(request): Json<RespondApiRequest>,
) -> Json<RespondApiResponse> {
    let request: RespondRequest = request.into();
    let cancel = CancellationToken::new();

    match state.responder.respond(&request, &cancel).await {
        Ok(answer) => {
            let delivery = deliver_if_addressed(&state, &request, &answer).await;
            Json(RespondApiResponse {
                status: "ok".into(),
                generated_text: Some(answer.text),
                error_message: None,
                delivery,
            })
        }
        Err(e) => Json(error_response(&e)),
    }
}

#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub query: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
}

/// Batch results come back in input order; a failed item is an error entry,
/// not a hole, and does not halt the items after it.
pub async fn respond_batch_handler(
    State(state): State<AppState>,
    Json(requests): Json<Vec<RespondApiRequest>>,
) -> Json<Vec<BatchItemResponse>> {
    let requests: Vec<RespondRequest> = requests.into_iter().map(Into::into).collect();
    let cancel = CancellationToken::new();

    let items = state.responder.respond_batch(&requests, &cancel).await;

    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        let response = match item.outcome {
            Ok(answer) => {
                let delivery = deliver_if_addressed(&state, &item.request, &answer).await;
                BatchItemResponse {
                    query: item.request.query,
                    status: "ok".into(),
                    generated_text: Some(answer.text),
                    error_message: None,
                    delivery,
                }
            }
            Err(e) => BatchItemResponse {
                query: item.request.query,
                status: "error".into(),
                generated_text: None,
                error_message: Some(e.to_string()),
                delivery: None,
            },
        };
        responses.push(response);
    }

    Json(responses)
}

async fn deliver_if_addressed(
    state: &AppState,
    request: &RespondRequest,
    answer: &GeneratedAnswer,
) -> Option<DeliveryOutcome> {
    if request.recipient.is_none() {
        return None;
    }

    let Some(mailer) = &state.mailer else {
        return Some(DeliveryOutcome {
            channel: "email".into(),
            detail: None,
            error: Some("no mail relay configured".into()),
        });
    };

    match mailer.deliver(request, answer).await {
        Ok(receipt) => Some(DeliveryOutcome {
            channel: receipt.channel,
            detail: Some(receipt.detail),
            error: None,
        }),
        Err(e) => {
            tracing::error!(error = %e, "email delivery failed");
            Some(DeliveryOutcome {
                channel: "email".into(),
                detail: None,
                error: Some(e.to_string()),
            })
        }
    }
}

fn error_response(e: &PipelineError) -> RespondApiResponse {
    RespondApiResponse {
        status: "error".into(),
        generated_text: None,
        error_message: Some(e.to_string()),
        delivery: None,
    }
}
