//! Metadata store adapter: `upsert(record)` plus the lookups the orchestrator
//! needs to drive the Job/PageStage state machine.

use std::collections::HashMap;
use std::sync::Arc;

use ddc_common::{DiffResult, Job, PageStage, StageKind};
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("DDC_PG_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DDC_PG_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: std::env::var("DDC_PG_DB").unwrap_or_else(|_| "drawing_diff_core".to_string()),
            user: std::env::var("DDC_PG_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("DDC_PG_PASSWORD").unwrap_or_default(),
        }
    }
}

impl PostgresConfig {
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, self.password
        )
    }
}

/// `upsert(record)` for each of the three record kinds, plus the queries the
/// orchestrator's event handlers need to advance a page through its stages.
#[async_trait::async_trait]
pub trait MetadataStorage: Send + Sync {
    async fn init_schema(&self) -> StorageResult<()>;

    async fn upsert_job(&self, job: &Job) -> StorageResult<()>;
    async fn get_job(&self, job_id: &str) -> StorageResult<Job>;
    async fn find_job_by_hashes(&self, old_hash: &str, new_hash: &str) -> StorageResult<Option<Job>>;

    async fn upsert_page_stage(&self, stage: &PageStage) -> StorageResult<()>;
    async fn get_page_stage(&self, job_id: &str, page_number: u32, stage: StageKind) -> StorageResult<Option<PageStage>>;
    async fn list_page_stages(&self, job_id: &str) -> StorageResult<Vec<PageStage>>;

    async fn upsert_diff_result(&self, result: &DiffResult) -> StorageResult<()>;
    async fn get_diff_result(&self, job_id: &str, page_number: u32) -> StorageResult<Option<DiffResult>>;

    async fn delete_job_data(&self, job_id: &str) -> StorageResult<()>;
}

pub struct PostgresMetadataStorage {
    client: Client,
}

impl PostgresMetadataStorage {
    pub async fn new(config: PostgresConfig) -> StorageResult<Self> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string(), NoTls)
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection closed with error");
            }
        });
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl MetadataStorage for PostgresMetadataStorage {
    async fn init_schema(&self) -> StorageResult<()> {
        self.client
            .batch_execute(
                r"
                CREATE TABLE IF NOT EXISTS jobs (
                    id TEXT PRIMARY KEY,
                    old_doc_ref TEXT NOT NULL,
                    new_doc_ref TEXT NOT NULL,
                    old_hash TEXT NOT NULL,
                    new_hash TEXT NOT NULL,
                    total_pages INTEGER NOT NULL,
                    pairing_mode TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    started_at TIMESTAMPTZ,
                    completed_at TIMESTAMPTZ,
                    status TEXT NOT NULL,
                    error TEXT
                );
                CREATE INDEX IF NOT EXISTS jobs_hashes_idx ON jobs (old_hash, new_hash);

                CREATE TABLE IF NOT EXISTS page_stages (
                    job_id TEXT NOT NULL,
                    page_number INTEGER NOT NULL,
                    stage TEXT NOT NULL,
                    status TEXT NOT NULL,
                    started_at TIMESTAMPTZ,
                    completed_at TIMESTAMPTZ,
                    result_ref TEXT,
                    error TEXT,
                    retry_count INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (job_id, page_number, stage)
                );

                CREATE TABLE IF NOT EXISTS diff_results (
                    id TEXT PRIMARY KEY,
                    job_id TEXT NOT NULL,
                    page_number INTEGER NOT NULL,
                    payload JSONB NOT NULL,
                    UNIQUE (job_id, page_number)
                );
                ",
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        Ok(())
    }

    async fn upsert_job(&self, job: &Job) -> StorageResult<()> {
        let pairing_mode = serde_json::to_string(&job.pairing_mode)?;
        let status = serde_json::to_string(&job.status)?;
        self.client
            .execute(
                r"
                INSERT INTO jobs (id, old_doc_ref, new_doc_ref, old_hash, new_hash, total_pages,
                                   pairing_mode, created_at, started_at, completed_at, status, error)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
                ON CONFLICT (id) DO UPDATE SET
                    started_at = EXCLUDED.started_at,
                    completed_at = EXCLUDED.completed_at,
                    status = EXCLUDED.status,
                    error = EXCLUDED.error
                ",
                &[
                    &job.id,
                    &job.old_doc_ref,
                    &job.new_doc_ref,
                    &job.old_hash,
                    &job.new_hash,
                    &(job.total_pages as i32),
                    &pairing_mode,
                    &job.created_at,
                    &job.started_at,
                    &job.completed_at,
                    &status,
                    &job.error,
                ],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> StorageResult<Job> {
        let row = self
            .client
            .query_opt(
                r"
                SELECT id, old_doc_ref, new_doc_ref, old_hash, new_hash, total_pages,
                       pairing_mode, created_at, started_at, completed_at, status, error
                FROM jobs WHERE id = $1
                ",
                &[&job_id],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(job_id.to_string()))?;
        row_to_job(&row)
    }

    async fn find_job_by_hashes(&self, old_hash: &str, new_hash: &str) -> StorageResult<Option<Job>> {
        let row = self
            .client
            .query_opt(
                r"
                SELECT id, old_doc_ref, new_doc_ref, old_hash, new_hash, total_pages,
                       pairing_mode, created_at, started_at, completed_at, status, error
                FROM jobs WHERE old_hash = $1 AND new_hash = $2
                ",
                &[&old_hash, &new_hash],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        row.as_ref().map(row_to_job).transpose()
    }

    async fn upsert_page_stage(&self, stage: &PageStage) -> StorageResult<()> {
        let stage_kind = serde_json::to_string(&stage.stage)?;
        let status = serde_json::to_string(&stage.status)?;
        self.client
            .execute(
                r"
                INSERT INTO page_stages (job_id, page_number, stage, status, started_at,
                                          completed_at, result_ref, error, retry_count)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
                ON CONFLICT (job_id, page_number, stage) DO UPDATE SET
                    status = EXCLUDED.status,
                    started_at = EXCLUDED.started_at,
                    completed_at = EXCLUDED.completed_at,
                    result_ref = EXCLUDED.result_ref,
                    error = EXCLUDED.error,
                    retry_count = EXCLUDED.retry_count
                ",
                &[
                    &stage.job_id,
                    &(stage.page_number as i32),
                    &stage_kind,
                    &status,
                    &stage.started_at,
                    &stage.completed_at,
                    &stage.result_ref,
                    &stage.error,
                    &(stage.retry_count as i32),
                ],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        Ok(())
    }

    async fn get_page_stage(&self, job_id: &str, page_number: u32, stage: StageKind) -> StorageResult<Option<PageStage>> {
        let stage_kind = serde_json::to_string(&stage)?;
        let row = self
            .client
            .query_opt(
                r"
                SELECT job_id, page_number, stage, status, started_at, completed_at,
                       result_ref, error, retry_count
                FROM page_stages WHERE job_id = $1 AND page_number = $2 AND stage = $3
                ",
                &[&job_id, &(page_number as i32), &stage_kind],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        row.as_ref().map(row_to_page_stage).transpose()
    }

    async fn list_page_stages(&self, job_id: &str) -> StorageResult<Vec<PageStage>> {
        let rows = self
            .client
            .query(
                r"
                SELECT job_id, page_number, stage, status, started_at, completed_at,
                       result_ref, error, retry_count
                FROM page_stages WHERE job_id = $1
                ",
                &[&job_id],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        rows.iter().map(row_to_page_stage).collect()
    }

    async fn upsert_diff_result(&self, result: &DiffResult) -> StorageResult<()> {
        let payload = serde_json::to_value(result)?;
        self.client
            .execute(
                r"
                INSERT INTO diff_results (id, job_id, page_number, payload)
                VALUES ($1,$2,$3,$4)
                ON CONFLICT (job_id, page_number) DO UPDATE SET payload = EXCLUDED.payload
                ",
                &[&result.id, &result.job_id, &(result.page_number as i32), &payload],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        Ok(())
    }

    async fn get_diff_result(&self, job_id: &str, page_number: u32) -> StorageResult<Option<DiffResult>> {
        let row = self
            .client
            .query_opt(
                "SELECT payload FROM diff_results WHERE job_id = $1 AND page_number = $2",
                &[&job_id, &(page_number as i32)],
            )
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        row.map(|row| {
            let payload: serde_json::Value = row.get("payload");
            serde_json::from_value(payload).map_err(StorageError::from)
        })
        .transpose()
    }

    async fn delete_job_data(&self, job_id: &str) -> StorageResult<()> {
        self.client
            .execute("DELETE FROM page_stages WHERE job_id = $1", &[&job_id])
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        self.client
            .execute("DELETE FROM diff_results WHERE job_id = $1", &[&job_id])
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        self.client
            .execute("DELETE FROM jobs WHERE id = $1", &[&job_id])
            .await
            .map_err(|e| StorageError::PostgresError(e.to_string()))?;
        Ok(())
    }
}

fn row_to_job(row: &Row) -> StorageResult<Job> {
    let pairing_mode: String = row.get("pairing_mode");
    let status: String = row.get("status");
    Ok(Job {
        id: row.get("id"),
        old_doc_ref: row.get("old_doc_ref"),
        new_doc_ref: row.get("new_doc_ref"),
        old_hash: row.get("old_hash"),
        new_hash: row.get("new_hash"),
        total_pages: row.get::<_, i32>("total_pages") as u32,
        pairing_mode: serde_json::from_str(&pairing_mode)?,
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        status: serde_json::from_str(&status)?,
        error: row.get("error"),
    })
}

fn row_to_page_stage(row: &Row) -> StorageResult<PageStage> {
    let stage: String = row.get("stage");
    let status: String = row.get("status");
    Ok(PageStage {
        job_id: row.get("job_id"),
        page_number: row.get::<_, i32>("page_number") as u32,
        stage: serde_json::from_str(&stage)?,
        status: serde_json::from_str(&status)?,
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        result_ref: row.get("result_ref"),
        error: row.get("error"),
        retry_count: row.get::<_, i32>("retry_count") as u32,
    })
}

type StageKey = (String, u32, StageKind);

/// In-process metadata store backing the standalone CLI and the orchestrator's
/// own test suite. Writes are serialized per-row via a single `RwLock`,
/// giving optimistic concurrency per `PageStage` row in spirit (no concurrent
/// writer ever observes a torn row).
#[derive(Default)]
pub struct InMemoryMetadataStorage {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    stages: Arc<RwLock<HashMap<StageKey, PageStage>>>,
    diffs: Arc<RwLock<HashMap<(String, u32), DiffResult>>>,
}

impl InMemoryMetadataStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MetadataStorage for InMemoryMetadataStorage {
    async fn init_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn upsert_job(&self, job: &Job) -> StorageResult<()> {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> StorageResult<Job> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(job_id.to_string()))
    }

    async fn find_job_by_hashes(&self, old_hash: &str, new_hash: &str) -> StorageResult<Option<Job>> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .find(|j| j.old_hash == old_hash && j.new_hash == new_hash)
            .cloned())
    }

    async fn upsert_page_stage(&self, stage: &PageStage) -> StorageResult<()> {
        self.stages.write().await.insert(stage.key(), stage.clone());
        Ok(())
    }

    async fn get_page_stage(&self, job_id: &str, page_number: u32, stage: StageKind) -> StorageResult<Option<PageStage>> {
        Ok(self
            .stages
            .read()
            .await
            .get(&(job_id.to_string(), page_number, stage))
            .cloned())
    }

    async fn list_page_stages(&self, job_id: &str) -> StorageResult<Vec<PageStage>> {
        Ok(self
            .stages
            .read()
            .await
            .values()
            .filter(|s| s.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn upsert_diff_result(&self, result: &DiffResult) -> StorageResult<()> {
        self.diffs
            .write()
            .await
            .insert((result.job_id.clone(), result.page_number), result.clone());
        Ok(())
    }

    async fn get_diff_result(&self, job_id: &str, page_number: u32) -> StorageResult<Option<DiffResult>> {
        Ok(self.diffs.read().await.get(&(job_id.to_string(), page_number)).cloned())
    }

    async fn delete_job_data(&self, job_id: &str) -> StorageResult<()> {
        self.jobs.write().await.remove(job_id);
        self.stages.write().await.retain(|k, _| k.0 != job_id);
        self.diffs.write().await.retain(|k, _| k.0 != job_id);
        Ok(())
    }
}
