//! Request/response shapes for the ingestion and polling API.

use serde::{Deserialize, Serialize};

/// Submits a pair of documents for diffing. Page counts and any recognized
/// per-page drawing names are supplied by the caller (this service never
/// opens the PDF itself — that is the Raster Gateway's job, invoked by the
/// stage worker once OCR has run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    /// Base64-encoded bytes of the "old" document.
    pub old_document: String,
    /// Base64-encoded bytes of the "new" document.
    pub new_document: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Recognized drawing name per old page, `null` where unknown.
    pub old_page_names: Vec<Option<String>>,
    /// Recognized drawing name per new page, `null` where unknown.
    pub new_page_names: Vec<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub total_pages: u32,
    pub completed_pages: u32,
    pub failed_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStageView {
    pub stage: String,
    pub status: String,
    pub retry_count: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStatusResponse {
    pub job_id: String,
    pub page_number: u32,
    pub stages: Vec<PageStageView>,
    pub old_page_ref: Option<String>,
    pub new_page_ref: Option<String>,
    pub overlay_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_round_trips_through_json() {
        let req = SubmitJobRequest {
            old_document: "aGVsbG8=".to_string(),
            new_document: "d29ybGQ=".to_string(),
            project_id: Some("proj-1".to_string()),
            user_id: None,
            old_page_names: vec![Some("A-101".to_string())],
            new_page_names: vec![Some("A-101".to_string())],
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: SubmitJobRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.project_id.as_deref(), Some("proj-1"));
        assert_eq!(back.old_page_names.len(), 1);
    }
}
