//! Stage task message shapes, with fixed field names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrTaskMessage {
    pub job_id: String,
    pub page_number: u32,
    pub old_page_gcs: String,
    pub new_page_gcs: String,
    pub drawing_name: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffTaskMessage {
    pub job_id: String,
    pub page_number: u32,
    pub old_page_gcs: String,
    pub new_page_gcs: String,
    pub old_ocr_ref: Option<String>,
    pub new_ocr_ref: Option<String>,
    pub drawing_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryTaskMessage {
    pub job_id: String,
    pub page_number: u32,
    pub diff_result_id: String,
    pub overlay_ref: String,
    pub drawing_name: Option<String>,
}

pub const TOPIC_OCR: &str = "ocr";
pub const TOPIC_DIFF: &str = "diff";
pub const TOPIC_SUMMARY: &str = "summary";
