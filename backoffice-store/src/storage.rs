//! Key-value store interface
//!
//! The store only moves opaque blobs; versioning and validation live above
//! it in the actor and service. Values written with a TTL read as absent once
//! it has elapsed.

use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// Blob store keyed by string
pub trait KvStore: Send + Sync {
    /// Read a value (`None` when absent or expired)
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one
    fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Remove a value (no-op when absent)
    fn delete(&self, key: &str) -> Result<()>;
}

/// Milliseconds since Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Absolute expiry for a TTL starting now
pub(crate) fn expiry_millis(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)))
}

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<i64>,
}

/// In-process store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys
    pub fn len(&self) -> usize {
        let now = now_millis();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at.map_or(true, |at| at > now))
            .count()
    }

    /// Whether no live keys remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = now_millis();
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at.map_or(true, |at| at > now))
            .map(|e| e.value.clone()))
    }

    fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: expiry_millis(ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
