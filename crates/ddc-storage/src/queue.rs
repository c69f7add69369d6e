//! Task queue adapter: `publish(topic, message)`. The production deployment
//! this crate was extracted from backs this with a hosted broker; the core
//! only ever depends on the trait below, so swapping brokers never touches
//! orchestrator logic. The in-process implementation here (backed by `tokio`
//! channels, already part of the workspace's async runtime) is what the
//! orchestrator falls back to when no external queue is configured, running
//! each stage synchronously in a background worker pool instead.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::error::{StorageError, StorageResult};

#[async_trait::async_trait]
pub trait TaskQueue: Send + Sync {
    async fn publish_json(&self, topic: &str, message: serde_json::Value) -> StorageResult<()>;
}

/// Typed convenience wrapper over [`TaskQueue::publish_json`].
pub async fn publish<T: Serialize + Sync>(queue: &dyn TaskQueue, topic: &str, message: &T) -> StorageResult<()> {
    let value = serde_json::to_value(message)?;
    queue.publish_json(topic, value).await
}

/// Decodes a message previously published with [`publish`].
pub fn decode<T: DeserializeOwned>(value: serde_json::Value) -> StorageResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Single-process queue: one unbounded `mpsc` channel per topic. Workers
/// subscribe with [`InProcessTaskQueue::subscribe`] before any publish to
/// that topic, mirroring a pub/sub broker's topic-creation semantics closely
/// enough for a synchronous-fallback mode with no external broker.
#[derive(Clone, Default)]
pub struct InProcessTaskQueue {
    senders: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<serde_json::Value>>>>,
}

impl InProcessTaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<serde_json::Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().await.insert(topic.to_string(), tx);
        rx
    }
}

#[async_trait::async_trait]
impl TaskQueue for InProcessTaskQueue {
    async fn publish_json(&self, topic: &str, message: serde_json::Value) -> StorageResult<()> {
        let senders = self.senders.lock().await;
        match senders.get(topic) {
            Some(tx) => tx.send(message).map_err(|_| StorageError::QueueClosed),
            None => {
                tracing::warn!(topic, "publish to topic with no subscriber");
                Ok(())
            }
        }
    }
}
