//! Storage adapters for the Drawing Diff Core: a blob store, a metadata
//! store, and a task queue, each behind a narrow trait so the orchestrator
//! and stage workers never name a concrete backend.

mod blob;
mod error;
mod metadata;
mod queue;

pub use blob::{page_artifact_path, LocalObjectStorage, ObjectStorage, S3Config, S3ObjectStorage};
pub use error::{StorageError, StorageResult};
pub use metadata::{InMemoryMetadataStorage, MetadataStorage, PostgresConfig, PostgresMetadataStorage};
pub use queue::{decode, publish, InProcessTaskQueue, TaskQueue};
