use axum::{extract::State, http::StatusCode, Json};
use deadpool_redis::redis::cmd;
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub redis: &'static str,
    pub collection: String,
    pub persona: String,
}

/// Liveness only: answers as long as the process is up. Dependency state
/// belongs to the readiness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness gates on Redis, which backs both the completion cache and the
/// job queue. Qdrant is verified once at startup and not re-probed here.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let redis_up = match state.redis_pool.get().await {
        Ok(mut conn) => {
            let ping: Result<String, _> = cmd("PING").query_async(&mut *conn).await;
            ping.is_ok()
        }
        Err(_) => false,
    };

    let response = ReadinessResponse {
        status: if redis_up { "ready" } else { "not_ready" },
        redis: if redis_up { "connected" } else { "disconnected" },
        collection: state.config.collection.clone(),
        persona: state.config.persona.name.clone(),
    };

    if redis_up {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_service_identity() {
        let Json(body) = health_check().await;

        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "rag-responder");
        assert!(!body.version.is_empty());
    }
}
