use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3Error(String),

    #[error("Postgres error: {0}")]
    PostgresError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("queue closed")]
    QueueClosed,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Whether this looks like a timeout/5xx condition worth retrying, as
    /// opposed to a permanent condition (not found, malformed data) that
    /// would fail identically on a retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::S3Error(_) | StorageError::PostgresError(_) | StorageError::IoError(_) | StorageError::QueueClosed
        )
    }
}

impl From<StorageError> for ddc_common::DiffError {
    fn from(err: StorageError) -> Self {
        let transient = err.is_transient();
        ddc_common::DiffError::io(err.to_string(), transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_permanent() {
        let err = StorageError::NotFound("job-1".into());
        assert!(!err.is_transient());
        assert!(!matches!(ddc_common::DiffError::from(err), ddc_common::DiffError::Io { transient: true, .. }));
    }

    #[test]
    fn postgres_and_s3_errors_are_transient() {
        assert!(StorageError::PostgresError("connection reset".into()).is_transient());
        assert!(StorageError::S3Error("503".into()).is_transient());
    }
}
