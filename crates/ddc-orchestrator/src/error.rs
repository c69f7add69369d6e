use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("page stage not found: job={job_id} page={page_number} stage={stage:?}")]
    PageStageNotFound {
        job_id: String,
        page_number: u32,
        stage: ddc_common::StageKind,
    },

    #[error("job {0} is no longer active")]
    JobInactive(String),

    #[error(transparent)]
    Storage(#[from] ddc_storage::StorageError),
}

pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;

impl From<OrchestratorError> for ddc_common::DiffError {
    fn from(err: OrchestratorError) -> Self {
        // JobNotFound/PageStageNotFound/JobInactive are permanent conditions
        // a retry cannot fix; only the wrapped storage error's own kind can
        // be transient.
        let transient = matches!(&err, OrchestratorError::Storage(storage_err) if storage_err.is_transient());
        ddc_common::DiffError::io(err.to_string(), transient)
    }
}
