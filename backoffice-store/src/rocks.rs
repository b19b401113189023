//! RocksDB-backed key-value store
//!
//! # Column Families
//!
//! - `documents` - Document blobs (key: collection key)
//! - `expiry` - Absolute expiry per key (big-endian epoch millis)
//!
//! A document and its expiry are always written in one `WriteBatch`.

use crate::{
    error::{Error, Result},
    storage::{expiry_millis, now_millis, KvStore},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::sync::Arc;
use std::time::Duration;

/// Column family names
const CF_DOCUMENTS: &str = "documents";
const CF_EXPIRY: &str = "expiry";

/// Persistent store wrapper for RocksDB
pub struct RocksStore {
    db: Arc<DB>,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_DOCUMENTS, Self::cf_options_documents()),
            ColumnFamilyDescriptor::new(CF_EXPIRY, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB document store");

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_options_documents() -> Options {
        let mut opts = Options::default();
        // Documents are JSON text and compress well
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn read_expiry(&self, key: &str) -> Result<Option<i64>> {
        let cf = self.cf_handle(CF_EXPIRY)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Error::Storage(format!("Corrupt expiry record for {}", key))
                })?;
                Ok(Some(i64::from_be_bytes(raw)))
            }
        }
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(expires_at) = self.read_expiry(key)? {
            if expires_at <= now_millis() {
                tracing::debug!(key, "Document expired");
                return Ok(None);
            }
        }

        let cf = self.cf_handle(CF_DOCUMENTS)?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let cf_documents = self.cf_handle(CF_DOCUMENTS)?;
        let cf_expiry = self.cf_handle(CF_EXPIRY)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_documents, key.as_bytes(), value);
        match expiry_millis(ttl) {
            Some(at) => batch.put_cf(cf_expiry, key.as_bytes(), at.to_be_bytes()),
            None => batch.delete_cf(cf_expiry, key.as_bytes()),
        }
        self.db.write(batch)?;

        tracing::debug!(key, bytes = value.len(), "Document written");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let cf_documents = self.cf_handle(CF_DOCUMENTS)?;
        let cf_expiry = self.cf_handle(CF_EXPIRY)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(cf_documents, key.as_bytes());
        batch.delete_cf(cf_expiry, key.as_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RocksStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let store = RocksStore::open(&config).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_open_storage() {
        let (_dir, store) = open_temp();
        assert!(store.cf_handle(CF_DOCUMENTS).is_ok());
        assert!(store.cf_handle(CF_EXPIRY).is_ok());
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, store) = open_temp();

        store.put("orders", b"{\"items\":[]}", Some(Duration::from_secs(60))).unwrap();
        assert_eq!(store.get("orders").unwrap(), Some(b"{\"items\":[]}".to_vec()));

        store.delete("orders").unwrap();
        assert_eq!(store.get("orders").unwrap(), None);
    }

    #[test]
    fn test_expired_value_reads_as_absent() {
        let (_dir, store) = open_temp();

        store.put("shipments", b"x", Some(Duration::ZERO)).unwrap();
        assert_eq!(store.get("shipments").unwrap(), None);

        // Rewriting without a TTL clears the old expiry
        store.put("shipments", b"y", None).unwrap();
        assert_eq!(store.get("shipments").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn test_reopen_keeps_documents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        {
            let store = RocksStore::open(&config).unwrap();
            store.put("global", b"{}", None).unwrap();
        }

        let store = RocksStore::open(&config).unwrap();
        assert_eq!(store.get("global").unwrap(), Some(b"{}".to_vec()));
    }
}
