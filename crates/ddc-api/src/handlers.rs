//! HTTP request handlers for the ingestion and polling API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use ddc_orchestrator::SubmitRequest;
use ddc_storage::ObjectStorage;

use crate::types::{
    ErrorResponse, HealthResponse, JobStatusResponse, PageStageView, PageStatusResponse,
    SubmitJobRequest, SubmitJobResponse,
};
use crate::ApiState;

fn json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message.into() }))
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".to_string(), version: env!("CARGO_PKG_VERSION").to_string() })
}

/// Ingestion endpoint. Idempotent by content hash: resubmitting the same
/// `(old_hash, new_hash)` pair within the orchestrator's duplicate window
/// returns the existing `job_id` instead of creating a new Job.
pub async fn submit_job(
    State(state): State<ApiState>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let old_bytes = base64::engine::general_purpose::STANDARD
        .decode(&request.old_document)
        .map_err(|e| bad_request(format!("old_document is not valid base64: {e}")))?;
    let new_bytes = base64::engine::general_purpose::STANDARD
        .decode(&request.new_document)
        .map_err(|e| bad_request(format!("new_document is not valid base64: {e}")))?;

    if old_bytes.is_empty() || new_bytes.is_empty() {
        return Err(bad_request("old_document and new_document must be non-empty"));
    }

    let old_hash = hex_sha256(&old_bytes);
    let new_hash = hex_sha256(&new_bytes);

    let old_doc_ref = format!("documents/{old_hash}.pdf");
    let new_doc_ref = format!("documents/{new_hash}.pdf");
    state.blobs.put(&old_doc_ref, &old_bytes).await.map_err(|e| {
        error!(%e, "failed to store old document");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() }))
    })?;
    state.blobs.put(&new_doc_ref, &new_bytes).await.map_err(|e| {
        error!(%e, "failed to store new document");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() }))
    })?;

    let job_id = state
        .orchestrator
        .submit(SubmitRequest {
            old_doc_ref,
            new_doc_ref,
            old_hash,
            new_hash,
            old_page_names: request.old_page_names,
            new_page_names: request.new_page_names,
        })
        .await
        .map_err(|e| {
            error!(%e, "failed to submit job");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() }))
        })?;

    info!(job_id = %job_id, "job submitted");
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })))
}

pub async fn get_job(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let summary = state.orchestrator.get_job(&job_id).await.map_err(|e| {
        (StatusCode::NOT_FOUND, Json(ErrorResponse { error: e.to_string() }))
    })?;
    Ok(Json(JobStatusResponse {
        job_id,
        status: json_string(&summary.status),
        total_pages: summary.total_pages,
        completed_pages: summary.completed_pages,
        failed_pages: summary.failed_pages,
    }))
}

pub async fn get_page(
    State(state): State<ApiState>,
    Path((job_id, page_number)): Path<(String, u32)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let result = state.orchestrator.get_page(&job_id, page_number).await.map_err(|e| {
        (StatusCode::NOT_FOUND, Json(ErrorResponse { error: e.to_string() }))
    })?;

    let stages = result
        .stages
        .iter()
        .map(|s| PageStageView {
            stage: json_string(&s.stage),
            status: json_string(&s.status),
            retry_count: s.retry_count,
            error: s.error.clone(),
        })
        .collect();

    Ok(Json(PageStatusResponse {
        job_id,
        page_number,
        stages,
        old_page_ref: result.old_page_ref,
        new_page_ref: result.new_page_ref,
        overlay_ref: result.overlay_ref,
    }))
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_sha256_is_deterministic_and_64_chars() {
        let a = hex_sha256(b"hello");
        let b = hex_sha256(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hex_sha256_differs_for_different_input() {
        assert_ne!(hex_sha256(b"old"), hex_sha256(b"new"));
    }
}
