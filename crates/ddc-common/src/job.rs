use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::SimilarityTransform;

/// Result of `FeatureSimilarityEstimator::align` / `IcpRefiner::refine`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub transform: SimilarityTransform,
    pub inlier_count: usize,
    pub total_matches: usize,
    pub score: f64,
}

impl AlignmentResult {
    #[must_use]
    pub fn identity_unmatched() -> Self {
        AlignmentResult {
            transform: SimilarityTransform::IDENTITY,
            inlier_count: 0,
            total_matches: 0,
            score: 0.0,
        }
    }

    /// `score = min(1, inliers / (0.1 * min(kp_old, kp_new)))`.
    #[must_use]
    pub fn score_for(inliers: usize, kp_old: usize, kp_new: usize) -> f64 {
        let denom = 0.1 * kp_old.min(kp_new) as f64;
        if denom <= 0.0 {
            return 0.0;
        }
        (inliers as f64 / denom).min(1.0)
    }
}

/// How pages of the old and new documents were paired for diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    ByDrawingName,
    ByIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Ocr,
    Diff,
    Summary,
}

impl StageKind {
    #[must_use]
    pub fn next(self) -> Option<StageKind> {
        match self {
            StageKind::Ocr => Some(StageKind::Diff),
            StageKind::Diff => Some(StageKind::Summary),
            StageKind::Summary => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StageStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }
}

/// A pair of documents submitted for diffing. Owns its `PageStage` rows by
/// primary key (`job_id`); `PageStage` holds `job_id` only as a foreign key,
/// never a back-pointer, so the two never form a reference cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub old_doc_ref: String,
    pub new_doc_ref: String,
    pub old_hash: String,
    pub new_hash: String,
    pub total_pages: u32,
    pub pairing_mode: PairingMode,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl Job {
    #[must_use]
    pub fn new(
        id: String,
        old_doc_ref: String,
        new_doc_ref: String,
        old_hash: String,
        new_hash: String,
        total_pages: u32,
        pairing_mode: PairingMode,
        now: DateTime<Utc>,
    ) -> Self {
        Job {
            id,
            old_doc_ref,
            new_doc_ref,
            old_hash,
            new_hash,
            total_pages,
            pairing_mode,
            created_at: now,
            started_at: None,
            completed_at: None,
            status: JobStatus::Created,
            error: None,
        }
    }
}

/// One unit of work for one page in one of the three pipeline kinds.
///
/// Invariant enforced by the orchestrator: for a given
/// `(job_id, page_number, stage)` there is at most one row with
/// `status != Failed`; a retry updates the existing row in place and bumps
/// `retry_count` rather than inserting a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStage {
    pub job_id: String,
    pub page_number: u32,
    pub stage: StageKind,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_ref: Option<String>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl PageStage {
    #[must_use]
    pub fn pending(job_id: String, page_number: u32, stage: StageKind) -> Self {
        PageStage {
            job_id,
            page_number,
            stage,
            status: StageStatus::Pending,
            started_at: None,
            completed_at: None,
            result_ref: None,
            error: None,
            retry_count: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> (String, u32, StageKind) {
        (self.job_id.clone(), self.page_number, self.stage)
    }
}

/// Terminal per-page diff artifact record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub id: String,
    pub job_id: String,
    pub page_number: u32,
    pub old_page_ref: String,
    pub new_page_ref: String,
    pub overlay_ref: String,
    pub transform: SimilarityTransform,
    pub alignment_score: f64,
    pub change_count: u64,
    pub changes_detected: Option<bool>,
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_clamps_to_one() {
        assert!((AlignmentResult::score_for(1000, 100, 100) - 1.0).abs() < 1e-9);
        assert_eq!(AlignmentResult::score_for(5, 100, 100), 0.5);
        assert_eq!(AlignmentResult::score_for(5, 0, 0), 0.0);
    }

    #[test]
    fn stage_kind_chains_ocr_diff_summary() {
        assert_eq!(StageKind::Ocr.next(), Some(StageKind::Diff));
        assert_eq!(StageKind::Diff.next(), Some(StageKind::Summary));
        assert_eq!(StageKind::Summary.next(), None);
    }

    #[test]
    fn page_stage_key_identifies_row() {
        let ps = PageStage::pending("job-1".into(), 3, StageKind::Ocr);
        assert_eq!(ps.key(), ("job-1".to_string(), 3, StageKind::Ocr));
        assert_eq!(ps.retry_count, 0);
        assert!(!ps.status.is_terminal());
    }
}
