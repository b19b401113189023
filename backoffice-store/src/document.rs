//! Stored document envelope
//!
//! Every key holds one JSON object: the body fields plus `updatedAt` and
//! `version`. Collections use `{items: [...]}` as their body; the price list
//! stores its fields at the top level.

use serde::{Deserialize, Serialize};

/// Body plus store-maintained metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<T> {
    /// Document content
    #[serde(flatten)]
    pub body: T,

    /// Last write, epoch milliseconds
    #[serde(default)]
    pub updated_at: i64,

    /// Write counter (absent document = 0)
    #[serde(default)]
    pub version: u64,
}

impl<T> Document<T> {
    /// Document that has never been stored
    pub fn unsaved(body: T) -> Self {
        Self {
            body,
            updated_at: 0,
            version: 0,
        }
    }
}

/// Body of a collection document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList<T> {
    /// Records
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> From<Vec<T>> for ItemList<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Metadata read without decoding the body
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentHeader {
    #[serde(default)]
    pub version: u64,
}
