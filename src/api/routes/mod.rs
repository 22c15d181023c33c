pub mod health;
pub mod jobs;
pub mod knowledge;
pub mod respond;
pub mod ws;

use axum::http::{header, Method};
use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/ws", get(ws::ws_handler))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/respond", post(respond::respond_handler))
        .route("/respond/batch", post(respond::respond_batch_handler))
        .route("/knowledge", post(knowledge::ingest_knowledge))
        .route(
            "/knowledge",
            axum::routing::delete(knowledge::clear_knowledge),
        )
        .route("/knowledge/search", post(knowledge::search_knowledge))
        .route("/jobs/respond", post(jobs::queue_respond))
        .route("/jobs/respond/batch", post(jobs::queue_batch))
        .route("/jobs/{job_id}", get(jobs::get_job_status))
}
