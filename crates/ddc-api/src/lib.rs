//! HTTP binding over the Streaming Orchestrator: ingestion and polling
//! endpoints.

mod handlers;
mod types;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use ddc_orchestrator::Orchestrator;
use ddc_storage::ObjectStorage;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use handlers::*;
pub use types::*;

/// Shared handler state: the orchestrator drives the Job/PageStage state
/// machine, the blob store holds submitted document bodies.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub blobs: Arc<dyn ObjectStorage>,
}

impl ApiState {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, blobs: Arc<dyn ObjectStorage>) -> Self {
        Self { orchestrator, blobs }
    }
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/jobs", post(submit_job))
        .route("/api/v1/jobs/{job_id}", get(get_job))
        .route("/api/v1/jobs/{job_id}/pages/{page_number}", get(get_page))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!(addr, "starting drawing diff core API server");
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
