//! Back Office Store
//!
//! Whole-document persistence for the back office collections, and the
//! service facade HTTP handlers call.
//!
//! # Architecture
//!
//! - **KvStore**: get/put/delete of blobs by string key with optional expiry
//!   (`MemoryStore`, `RocksStore`)
//! - **Single Writer**: one actor task owns the store; every load and save is
//!   a message to it, so compare-and-set on the document version is atomic
//! - **Validation**: payload limits and field checks before anything is persisted
//! - **BackOffice**: load → engine → persist for each collection
//!
//! # Invariants
//!
//! - A document is always written whole, with `version` bumped by one
//! - A write naming a stale version is rejected, never merged
//! - Engines see only validated, typed collections

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod metrics;
pub mod rocks;
pub mod service;
pub mod storage;
pub mod validate;

// Re-exports
pub use actor::{spawn_store_actor, StoreHandle};
pub use collection::{Collection, PRICE_LIST_KEY};
pub use config::Config;
pub use document::{Document, ItemList};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use rocks::RocksStore;
pub use service::BackOffice;
pub use storage::{KvStore, MemoryStore};
