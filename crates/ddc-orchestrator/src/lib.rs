//! The Streaming Orchestrator: Job/PageStage state machine, page pairing, and
//! retry/backoff policy.

mod completion;
mod config;
mod error;
mod messages;
mod orchestrator;
mod pairing;

pub use completion::{job_progress, page_outcome, JobProgress, PageOutcome};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use messages::{
    DiffTaskMessage, OcrTaskMessage, SummaryTaskMessage, TOPIC_DIFF, TOPIC_OCR, TOPIC_SUMMARY,
};
pub use orchestrator::{JobSummary, Orchestrator, PagePollResult, SubmitRequest};
pub use pairing::{choose_pairing_mode, pair_pages, PagePair};
