use thiserror::Error;

/// Top-level error taxonomy for the diff core, per the five error kinds
/// workers are allowed to raise: input, render/compose, align, I/O, external.
///
/// Align never appears here: alignment degrades to an identity transform with
/// score 0 instead of failing (see `ddc_feature_similarity`).
#[derive(Debug, Error, Clone)]
pub enum DiffError {
    #[error("input error: {0}")]
    Input(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("compose error: {0}")]
    Compose(String),

    /// `transient` distinguishes timeouts/5xx (retried with backoff) from
    /// auth/4xx (permanent, per §7 — retrying those would never succeed).
    #[error("storage error: {message}")]
    Io { message: String, transient: bool },

    #[error("external service error: {0}")]
    External(String),
}

impl DiffError {
    #[must_use]
    pub fn io(message: impl Into<String>, transient: bool) -> Self {
        DiffError::Io { message: message.into(), transient }
    }

    /// Whether the orchestrator's retry policy should republish the task at
    /// all. Permanent I/O and every kind other than transient I/O / external
    /// are not retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, DiffError::Io { transient: true, .. } | DiffError::External(_))
    }

    /// How many times the orchestrator may retry this error, given the
    /// configured transient-I/O retry budget. External-service calls (the
    /// summary LLM) get exactly one retry per §7, regardless of
    /// `configured_io_budget`.
    #[must_use]
    pub fn retry_budget(&self, configured_io_budget: u32) -> u32 {
        match self {
            DiffError::Io { transient: true, .. } => configured_io_budget,
            DiffError::External(_) => 1,
            _ => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiffError>;
