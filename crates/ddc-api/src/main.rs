//! Drawing Diff Core API server binary entry point.

use std::sync::Arc;

use ddc_api::{start_server, ApiState};
use ddc_orchestrator::{Orchestrator, OrchestratorConfig};
use ddc_storage::{InMemoryMetadataStorage, LocalObjectStorage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ddc_api=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("DDC_API_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let blob_root = std::env::var("DDC_LOCAL_BLOB_ROOT").unwrap_or_else(|_| "./ddc-blobs".to_string());

    let metadata = Arc::new(InMemoryMetadataStorage::new());
    let blobs = Arc::new(LocalObjectStorage::new(blob_root));
    let orchestrator = Arc::new(Orchestrator::new(metadata, None, OrchestratorConfig::default()));
    let state = ApiState::new(orchestrator, blobs);

    start_server(&addr, state).await?;
    Ok(())
}
