//! Single-writer document actor
//!
//! Every load and save goes through one task that owns the [`KvStore`], so a
//! save's read-compare-write on the document `version` cannot interleave with
//! another writer.
//!
//! ```text
//! StoreHandle (Clone) ──mpsc (bounded)──▶ DocumentActor ──▶ KvStore
//!        ▲                                     │
//!        └──────────── oneshot reply ──────────┘
//! ```
//!
//! Saves come in two flavours:
//!
//! - `expected_version = Some(v)`: compare-and-set; fails with
//!   `VersionConflict` unless the stored version is exactly `v`
//! - `expected_version = None`: unconditional overwrite; last writer wins

use crate::{
    config::StoreConfig,
    document::{Document, DocumentHeader},
    storage::{now_millis, KvStore},
    Error, Metrics, Result,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the document actor
#[derive(Debug)]
pub enum StoreMessage {
    /// Read the raw document
    Load {
        /// Document key
        key: String,
        /// Stored bytes, `None` when absent or expired
        response: oneshot::Sender<Result<Option<Vec<u8>>>>,
    },

    /// Write a document body, bumping its version
    Save {
        /// Document key
        key: String,
        /// JSON object to store; metadata fields are overwritten
        body: Value,
        /// Version the writer read, `None` for an unconditional write
        expected_version: Option<u64>,
        /// New version on success
        response: oneshot::Sender<Result<u64>>,
    },

    /// Remove a document
    Delete {
        /// Document key
        key: String,
        /// Completion of the delete
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the store
pub struct DocumentActor {
    /// Storage backend
    store: Arc<dyn KvStore>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<StoreMessage>,

    /// Expiry applied to every write
    ttl: Option<Duration>,

    metrics: Metrics,
}

impl std::fmt::Debug for DocumentActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentActor")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl DocumentActor {
    /// Create new actor
    pub fn new(
        store: Arc<dyn KvStore>,
        mailbox: mpsc::Receiver<StoreMessage>,
        ttl: Option<Duration>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            mailbox,
            ttl,
            metrics,
        }
    }

    /// Run the actor event loop until shutdown or every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                StoreMessage::Load { key, response } => {
                    let _ = response.send(self.store.get(&key));
                }

                StoreMessage::Save {
                    key,
                    body,
                    expected_version,
                    response,
                } => {
                    let result = self.save(&key, body, expected_version);
                    if let Err(e) = &result {
                        tracing::warn!(key = %key, error = %e, "Document save rejected");
                    }
                    let _ = response.send(result);
                }

                StoreMessage::Delete { key, response } => {
                    let _ = response.send(self.store.delete(&key));
                }

                StoreMessage::Shutdown => break,
            }
        }

        tracing::debug!("Document actor stopped");
    }

    fn stored_version(&self, key: &str) -> Result<u64> {
        match self.store.get(key)? {
            None => Ok(0),
            Some(bytes) => {
                let header: DocumentHeader = serde_json::from_slice(&bytes)?;
                Ok(header.version)
            }
        }
    }

    fn save(&self, key: &str, body: Value, expected_version: Option<u64>) -> Result<u64> {
        let mut fields = match body {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::Validation(format!(
                    "document body for {} must be an object, got {}",
                    key, other
                )))
            }
        };

        let current = self.stored_version(key)?;
        if let Some(expected) = expected_version {
            if expected != current {
                self.metrics.record_version_conflict();
                return Err(Error::VersionConflict {
                    key: key.to_string(),
                    expected,
                    actual: current,
                });
            }
        }

        let version = current + 1;
        fields.insert("updatedAt".to_string(), Value::from(now_millis()));
        fields.insert("version".to_string(), Value::from(version));

        let bytes = serde_json::to_vec(&Value::Object(fields))?;
        self.store.put(key, &bytes, self.ttl)?;
        self.metrics.record_document_saved();

        tracing::info!(
            key = %key,
            version,
            conditional = expected_version.is_some(),
            bytes = bytes.len(),
            "Document saved"
        );

        Ok(version)
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreMessage>,
}

impl StoreHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<StoreMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(msg(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Raw document bytes
    pub async fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        self.request(|response| StoreMessage::Load { key, response })
            .await
    }

    /// Typed document (`None` when absent or expired)
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Document<T>>> {
        match self.load_raw(key).await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// Write a document body; returns the new version
    pub async fn save(
        &self,
        key: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let key = key.to_string();
        self.request(|response| StoreMessage::Save {
            key,
            body,
            expected_version,
            response,
        })
        .await
    }

    /// Remove a document
    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.request(|response| StoreMessage::Delete { key, response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(StoreMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the document actor
pub fn spawn_store_actor(
    store: Arc<dyn KvStore>,
    config: &StoreConfig,
    metrics: Metrics,
) -> StoreHandle {
    // Bounded channel for backpressure
    let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
    let actor = DocumentActor::new(store, rx, config.document_ttl(), metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    StoreHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::ItemList, MemoryStore};
    use serde_json::json;

    fn spawn() -> (StoreHandle, Metrics) {
        let metrics = Metrics::new().unwrap();
        let handle = spawn_store_actor(
            Arc::new(MemoryStore::new()),
            &StoreConfig::default(),
            metrics.clone(),
        );
        (handle, metrics)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _) = spawn();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let (handle, metrics) = spawn();

        assert_eq!(handle.save("orders", json!({"items": []}), Some(0)).await.unwrap(), 1);
        assert_eq!(handle.save("orders", json!({"items": []}), Some(1)).await.unwrap(), 2);

        let doc: Document<ItemList<Value>> = handle.load("orders").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert!(doc.updated_at > 0);
        assert_eq!(metrics.documents_saved.get(), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_resets_version() {
        let (handle, _) = spawn();
        handle.save("expenses", json!({"items": [1]}), Some(0)).await.unwrap();
        handle.save("expenses", json!({"items": [2]}), Some(1)).await.unwrap();

        handle.delete("expenses").await.unwrap();
        assert!(handle.load_raw("expenses").await.unwrap().is_none());

        // A deleted document is absent again, so it starts over at version 1
        assert_eq!(
            handle.save("expenses", json!({"items": []}), Some(0)).await.unwrap(),
            1
        );

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let (handle, metrics) = spawn();
        handle.save("sales", json!({"items": [1]}), Some(0)).await.unwrap();

        let err = handle
            .save("sales", json!({"items": [2]}), Some(0))
            .await
            .unwrap_err();
        match err {
            Error::VersionConflict {
                key,
                expected,
                actual,
            } => {
                assert_eq!(key, "sales");
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(metrics.version_conflicts.get(), 1);

        // First write survives
        let doc: Document<ItemList<u32>> = handle.load("sales").await.unwrap().unwrap();
        assert_eq!(doc.body.items, vec![1]);
    }

    #[tokio::test]
    async fn test_unconditional_save_loses_update() {
        let (handle, _) = spawn();

        // Both writers read the empty document, then write without a version
        let mut a = ItemList::<String>::default();
        let mut b = ItemList::<String>::default();
        a.items.push("from-a".to_string());
        b.items.push("from-b".to_string());

        handle
            .save("expenses", serde_json::to_value(&a).unwrap(), None)
            .await
            .unwrap();
        let version = handle
            .save("expenses", serde_json::to_value(&b).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(version, 2);

        let doc: Document<ItemList<String>> = handle.load("expenses").await.unwrap().unwrap();
        assert_eq!(doc.body.items, vec!["from-b".to_string()]);
    }

    #[tokio::test]
    async fn test_non_object_body_rejected() {
        let (handle, _) = spawn();
        let err = handle.save("orders", json!([1, 2]), None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(handle.load_raw("orders").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_mailbox() {
        let (handle, _) = spawn();
        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = handle.load_raw("orders").await.unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }
}
