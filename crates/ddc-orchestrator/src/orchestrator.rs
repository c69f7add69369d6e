//! The Streaming Orchestrator: owns Jobs, drives each page's OCR/diff/summary
//! stages independently, and applies the retry/backoff policy.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ddc_common::{DiffError, DiffResult, Job, JobStatus, PageStage, PairingMode, StageKind, StageStatus};
use ddc_storage::{page_artifact_path, publish, MetadataStorage, TaskQueue};
use sha2::{Digest, Sha256};

use crate::completion::job_progress;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::messages::{DiffTaskMessage, OcrTaskMessage, SummaryTaskMessage, TOPIC_DIFF, TOPIC_OCR, TOPIC_SUMMARY};
use crate::pairing::{choose_pairing_mode, pair_pages, PagePair};

/// A new Job's input: content-addressed document references and, when
/// available, each page's recognized drawing name.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub old_doc_ref: String,
    pub new_doc_ref: String,
    pub old_hash: String,
    pub new_hash: String,
    pub old_page_names: Vec<Option<String>>,
    pub new_page_names: Vec<Option<String>>,
}

#[derive(Debug, Clone, Copy)]
pub struct JobSummary {
    pub status: JobStatus,
    pub total_pages: u32,
    pub completed_pages: u32,
    pub failed_pages: u32,
}

#[derive(Debug, Clone)]
pub struct PagePollResult {
    pub stages: Vec<PageStage>,
    pub old_page_ref: Option<String>,
    pub new_page_ref: Option<String>,
    pub overlay_ref: Option<String>,
}

pub struct Orchestrator {
    metadata: Arc<dyn MetadataStorage>,
    queue: Option<Arc<dyn TaskQueue>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStorage>, queue: Option<Arc<dyn TaskQueue>>, config: OrchestratorConfig) -> Self {
        Self { metadata, queue, config }
    }

    /// Idempotent by `(old_hash, new_hash)` within `config.duplicate_window`.
    pub async fn submit(&self, request: SubmitRequest) -> OrchestratorResult<String> {
        if let Some(existing) = self.metadata.find_job_by_hashes(&request.old_hash, &request.new_hash).await? {
            let age = Utc::now() - existing.created_at;
            if age <= self.config.duplicate_window {
                tracing::info!(job_id = %existing.id, "duplicate submission returns existing job");
                return Ok(existing.id);
            }
        }

        let job_id = Self::deterministic_job_id(&request.old_hash, &request.new_hash);
        let pairing_mode = choose_pairing_mode(&request.old_page_names, &request.new_page_names);
        let pairs = pair_pages(&request.old_page_names, &request.new_page_names, pairing_mode);

        if pairs.len() < request.old_page_names.len().min(request.new_page_names.len()) {
            tracing::warn!(
                job_id = %job_id,
                old_pages = request.old_page_names.len(),
                new_pages = request.new_page_names.len(),
                paired = pairs.len(),
                "page count or name mismatch between old and new documents"
            );
        }

        let now = Utc::now();
        let mut job = Job::new(
            job_id.clone(),
            request.old_doc_ref.clone(),
            request.new_doc_ref.clone(),
            request.old_hash.clone(),
            request.new_hash.clone(),
            pairs.len() as u32,
            pairing_mode,
            now,
        );
        job.status = JobStatus::InProgress;
        job.started_at = Some(now);
        self.metadata.upsert_job(&job).await?;

        for pair in &pairs {
            let stage = PageStage::pending(job_id.clone(), pair.page_number, StageKind::Ocr);
            self.metadata.upsert_page_stage(&stage).await?;
            self.publish_ocr_task(&job_id, &request, pair).await?;
        }

        tracing::info!(job_id = %job_id, total_pages = pairs.len(), ?pairing_mode, "job submitted");
        Ok(job_id)
    }

    async fn publish_ocr_task(&self, job_id: &str, request: &SubmitRequest, pair: &PagePair) -> OrchestratorResult<()> {
        let Some(queue) = &self.queue else { return Ok(()) };
        let message = OcrTaskMessage {
            job_id: job_id.to_string(),
            page_number: pair.page_number,
            old_page_gcs: page_artifact_path(job_id, pair.page_number, "old.png"),
            new_page_gcs: page_artifact_path(job_id, pair.page_number, "new.png"),
            drawing_name: pair.drawing_name.clone(),
            metadata: HashMap::new(),
        };
        let _ = request;
        publish(queue.as_ref(), TOPIC_OCR, &message).await?;
        Ok(())
    }

    fn deterministic_job_id(old_hash: &str, new_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(old_hash.as_bytes());
        hasher.update(b":");
        hasher.update(new_hash.as_bytes());
        let digest = hasher.finalize();
        format!("job_{}", hex_prefix(&digest, 16))
    }

    pub async fn get_job(&self, job_id: &str) -> OrchestratorResult<JobSummary> {
        let job = self.metadata.get_job(job_id).await.map_err(|_| OrchestratorError::JobNotFound(job_id.to_string()))?;
        let stages = self.metadata.list_page_stages(job_id).await?;
        let progress = job_progress(&stages, job.total_pages);
        Ok(JobSummary {
            status: job.status,
            total_pages: job.total_pages,
            completed_pages: progress.completed_pages,
            failed_pages: progress.failed_pages,
        })
    }

    pub async fn get_page(&self, job_id: &str, page_number: u32) -> OrchestratorResult<PagePollResult> {
        let all = self.metadata.list_page_stages(job_id).await?;
        let stages: Vec<PageStage> = all.into_iter().filter(|s| s.page_number == page_number).collect();
        let diff = self.metadata.get_diff_result(job_id, page_number).await?;
        Ok(PagePollResult {
            stages,
            old_page_ref: diff.as_ref().map(|d| d.old_page_ref.clone()),
            new_page_ref: diff.as_ref().map(|d| d.new_page_ref.clone()),
            overlay_ref: diff.as_ref().map(|d| d.overlay_ref.clone()),
        })
    }

    /// Called by the OCR stage worker on success: completes the OCR row and
    /// opens the diff stage.
    pub async fn on_page_ocr_done(&self, job_id: &str, page_number: u32, result_ref: Option<String>) -> OrchestratorResult<()> {
        if !self.job_is_active(job_id).await? {
            return Err(OrchestratorError::JobInactive(job_id.to_string()));
        }
        self.complete_stage(job_id, page_number, StageKind::Ocr, result_ref.clone()).await?;
        self.open_stage(job_id, page_number, StageKind::Diff).await?;

        if let Some(queue) = &self.queue {
            let message = DiffTaskMessage {
                job_id: job_id.to_string(),
                page_number,
                old_page_gcs: page_artifact_path(job_id, page_number, "old.png"),
                new_page_gcs: page_artifact_path(job_id, page_number, "new.png"),
                old_ocr_ref: result_ref.clone(),
                new_ocr_ref: result_ref,
                drawing_name: None,
            };
            publish(queue.as_ref(), TOPIC_DIFF, &message).await?;
        }
        Ok(())
    }

    /// Called by the diff stage worker on success: persists the
    /// `DiffResult`, completes the diff row, and opens the summary stage.
    pub async fn on_page_diff_done(&self, job_id: &str, page_number: u32, diff_result: DiffResult) -> OrchestratorResult<()> {
        if !self.job_is_active(job_id).await? {
            return Err(OrchestratorError::JobInactive(job_id.to_string()));
        }
        self.metadata.upsert_diff_result(&diff_result).await?;
        self.complete_stage(job_id, page_number, StageKind::Diff, Some(diff_result.id.clone())).await?;
        self.open_stage(job_id, page_number, StageKind::Summary).await?;

        if let Some(queue) = &self.queue {
            let message = SummaryTaskMessage {
                job_id: job_id.to_string(),
                page_number,
                diff_result_id: diff_result.id,
                overlay_ref: diff_result.overlay_ref,
                drawing_name: None,
            };
            publish(queue.as_ref(), TOPIC_SUMMARY, &message).await?;
        }
        Ok(())
    }

    /// Called by the summary stage worker on success: completes the summary
    /// row and, if the whole Job has reached a terminal state, finalizes it.
    pub async fn on_page_summary_done(&self, job_id: &str, page_number: u32, result_ref: Option<String>) -> OrchestratorResult<()> {
        self.complete_stage(job_id, page_number, StageKind::Summary, result_ref).await?;
        self.finalize_job_if_done(job_id).await
    }

    /// A stage worker's failure path. Transient I/O is republished (with
    /// exponential backoff) up to `config.retry_budget` times; external
    /// service errors get exactly one retry regardless of that budget;
    /// permanent errors mark the row failed immediately. Either way, a page
    /// that ends up failed terminally still counts toward Job completion.
    pub async fn fail_page_stage(&self, job_id: &str, page_number: u32, stage: StageKind, error: DiffError) -> OrchestratorResult<()> {
        let mut row = self
            .metadata
            .get_page_stage(job_id, page_number, stage)
            .await?
            .ok_or_else(|| OrchestratorError::PageStageNotFound { job_id: job_id.to_string(), page_number, stage })?;

        let should_retry = error.is_transient() && row.retry_count < error.retry_budget(self.config.retry_budget);
        row.error = Some(error.to_string());

        if should_retry {
            row.retry_count += 1;
            row.status = StageStatus::InProgress;
            self.metadata.upsert_page_stage(&row).await?;
            tracing::warn!(job_id, page_number, ?stage, attempt = row.retry_count, "retrying stage after transient error");
            self.republish_with_backoff(job_id, page_number, stage, row.retry_count);
        } else {
            row.status = StageStatus::Failed;
            row.completed_at = Some(Utc::now());
            self.metadata.upsert_page_stage(&row).await?;
            tracing::error!(job_id, page_number, ?stage, error = %error, "stage failed permanently");
            self.finalize_job_if_done(job_id).await?;
        }
        Ok(())
    }

    /// Spawns a delayed republish so the caller (an event handler) never
    /// itself suspends — the Orchestrator stays synchronous, and the
    /// actual backoff sleep lives in a detached task.
    fn republish_with_backoff(&self, job_id: &str, page_number: u32, stage: StageKind, attempt: u32) {
        let Some(queue) = self.queue.clone() else { return };
        let delay = self.config.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1));
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let topic = match stage {
                StageKind::Ocr => TOPIC_OCR,
                StageKind::Diff => TOPIC_DIFF,
                StageKind::Summary => TOPIC_SUMMARY,
            };
            let message = serde_json::json!({ "job_id": job_id, "page_number": page_number, "retry": true });
            if let Err(err) = queue.publish_json(topic, message).await {
                tracing::error!(job_id = %job_id, page_number, %err, "failed to republish retried stage task");
            }
        });
    }

    async fn job_is_active(&self, job_id: &str) -> OrchestratorResult<bool> {
        let job = self.metadata.get_job(job_id).await.map_err(|_| OrchestratorError::JobNotFound(job_id.to_string()))?;
        Ok(!matches!(job.status, JobStatus::Failed))
    }

    async fn complete_stage(&self, job_id: &str, page_number: u32, stage: StageKind, result_ref: Option<String>) -> OrchestratorResult<()> {
        let mut row = self
            .metadata
            .get_page_stage(job_id, page_number, stage)
            .await?
            .unwrap_or_else(|| PageStage::pending(job_id.to_string(), page_number, stage));
        row.status = StageStatus::Completed;
        row.completed_at = Some(Utc::now());
        row.result_ref = result_ref;
        self.metadata.upsert_page_stage(&row).await
    }

    async fn open_stage(&self, job_id: &str, page_number: u32, stage: StageKind) -> OrchestratorResult<()> {
        let mut row = PageStage::pending(job_id.to_string(), page_number, stage);
        row.status = StageStatus::InProgress;
        row.started_at = Some(Utc::now());
        self.metadata.upsert_page_stage(&row).await
    }

    async fn finalize_job_if_done(&self, job_id: &str) -> OrchestratorResult<()> {
        let mut job = self.metadata.get_job(job_id).await?;
        if matches!(job.status, JobStatus::Completed | JobStatus::Failed) {
            return Ok(());
        }

        let stages = self.metadata.list_page_stages(job_id).await?;
        let progress = job_progress(&stages, job.total_pages);
        if !progress.is_done() {
            return Ok(());
        }

        job.status = if progress.all_failed() { JobStatus::Failed } else { JobStatus::Completed };
        job.completed_at = Some(Utc::now());
        if job.status == JobStatus::Failed {
            job.error = Some(format!("all {} pages failed", progress.failed_pages));
        }
        tracing::info!(job_id, status = ?job.status, completed = progress.completed_pages, failed = progress.failed_pages, "job finalized");
        self.metadata.upsert_job(&job).await
    }
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>().chars().take(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddc_common::AlignmentResult;
    use ddc_storage::InMemoryMetadataStorage;
    use std::collections::HashMap as StdHashMap;

    fn make_orchestrator() -> Orchestrator {
        Orchestrator::new(Arc::new(InMemoryMetadataStorage::new()), None, OrchestratorConfig::default())
    }

    fn submit_request(pages: usize) -> SubmitRequest {
        SubmitRequest {
            old_doc_ref: "old.pdf".into(),
            new_doc_ref: "new.pdf".into(),
            old_hash: "h_old".into(),
            new_hash: "h_new".into(),
            old_page_names: vec![None; pages],
            new_page_names: vec![None; pages],
        }
    }

    fn diff_result(job_id: &str, page_number: u32) -> DiffResult {
        DiffResult {
            id: format!("{job_id}-{page_number}"),
            job_id: job_id.to_string(),
            page_number,
            old_page_ref: "old.png".into(),
            new_page_ref: "new.png".into(),
            overlay_ref: "overlay.png".into(),
            transform: ddc_common::SimilarityTransform::IDENTITY,
            alignment_score: AlignmentResult::identity_unmatched().score,
            change_count: 0,
            changes_detected: Some(false),
            metadata: StdHashMap::new(),
        }
    }

    #[tokio::test]
    async fn submit_is_idempotent_by_hash_pair() {
        let orch = make_orchestrator();
        let id_a = orch.submit(submit_request(2)).await.unwrap();
        let id_b = orch.submit(submit_request(2)).await.unwrap();
        assert_eq!(id_a, id_b);
    }

    #[tokio::test]
    async fn full_happy_path_completes_single_page_job() {
        let orch = make_orchestrator();
        let job_id = orch.submit(submit_request(1)).await.unwrap();

        orch.on_page_ocr_done(&job_id, 1, Some("ocr.json".into())).await.unwrap();
        orch.on_page_diff_done(&job_id, 1, diff_result(&job_id, 1)).await.unwrap();
        orch.on_page_summary_done(&job_id, 1, Some("summary.json".into())).await.unwrap();

        let summary = orch.get_job(&job_id).await.unwrap();
        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.completed_pages, 1);
        assert_eq!(summary.failed_pages, 0);
    }

    #[tokio::test]
    async fn one_permanently_failed_page_does_not_block_others() {
        let orch = make_orchestrator();
        let job_id = orch.submit(submit_request(3)).await.unwrap();

        for page in [1u32, 2, 3] {
            orch.on_page_ocr_done(&job_id, page, None).await.unwrap();
        }
        // Page 2's diff fails permanently (decode error, not transient).
        orch.fail_page_stage(&job_id, 2, StageKind::Diff, DiffError::Render("decode failed".into())).await.unwrap();
        for page in [1u32, 3] {
            orch.on_page_diff_done(&job_id, page, diff_result(&job_id, page)).await.unwrap();
            orch.on_page_summary_done(&job_id, page, None).await.unwrap();
        }

        let summary = orch.get_job(&job_id).await.unwrap();
        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.completed_pages, 2);
        assert_eq!(summary.failed_pages, 1);
    }

    #[tokio::test]
    async fn transient_failure_retries_in_place_without_terminal_state() {
        let orch = make_orchestrator();
        let job_id = orch.submit(submit_request(1)).await.unwrap();
        orch.on_page_ocr_done(&job_id, 1, None).await.unwrap();

        orch.fail_page_stage(&job_id, 1, StageKind::Diff, DiffError::io("timeout", true)).await.unwrap();

        let page = orch.get_page(&job_id, 1).await.unwrap();
        let diff_row = page.stages.iter().find(|s| s.stage == StageKind::Diff).unwrap();
        assert_eq!(diff_row.status, StageStatus::InProgress);
        assert_eq!(diff_row.retry_count, 1);
    }

    #[tokio::test]
    async fn permanent_io_error_fails_immediately_without_retry() {
        let orch = make_orchestrator();
        let job_id = orch.submit(submit_request(1)).await.unwrap();
        orch.on_page_ocr_done(&job_id, 1, None).await.unwrap();

        orch.fail_page_stage(&job_id, 1, StageKind::Diff, DiffError::io("permission denied", false)).await.unwrap();

        let page = orch.get_page(&job_id, 1).await.unwrap();
        let diff_row = page.stages.iter().find(|s| s.stage == StageKind::Diff).unwrap();
        assert_eq!(diff_row.status, StageStatus::Failed);
        assert_eq!(diff_row.retry_count, 0);
    }

    #[tokio::test]
    async fn external_error_retries_at_most_once_even_under_a_larger_io_budget() {
        let orch = Orchestrator::new(
            Arc::new(InMemoryMetadataStorage::new()),
            None,
            OrchestratorConfig { retry_budget: 3, ..OrchestratorConfig::default() },
        );
        let job_id = orch.submit(submit_request(1)).await.unwrap();
        orch.on_page_ocr_done(&job_id, 1, None).await.unwrap();
        orch.on_page_diff_done(&job_id, 1, diff_result(&job_id, 1)).await.unwrap();

        orch.fail_page_stage(&job_id, 1, StageKind::Summary, DiffError::External("llm timeout".into())).await.unwrap();
        let first_retry = orch.get_page(&job_id, 1).await.unwrap();
        let summary_row = first_retry.stages.iter().find(|s| s.stage == StageKind::Summary).unwrap();
        assert_eq!(summary_row.status, StageStatus::InProgress);
        assert_eq!(summary_row.retry_count, 1);

        orch.fail_page_stage(&job_id, 1, StageKind::Summary, DiffError::External("llm timeout again".into())).await.unwrap();
        let second_failure = orch.get_page(&job_id, 1).await.unwrap();
        let summary_row = second_failure.stages.iter().find(|s| s.stage == StageKind::Summary).unwrap();
        assert_eq!(summary_row.status, StageStatus::Failed);
        assert_eq!(summary_row.retry_count, 1);
    }

    #[tokio::test]
    async fn job_fails_only_when_every_page_fails() {
        let orch = make_orchestrator();
        let job_id = orch.submit(submit_request(1)).await.unwrap();
        orch.on_page_ocr_done(&job_id, 1, None).await.unwrap();
        orch.fail_page_stage(&job_id, 1, StageKind::Diff, DiffError::Render("decode failed".into())).await.unwrap();

        let summary = orch.get_job(&job_id).await.unwrap();
        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(summary.failed_pages, 1);
    }
}
