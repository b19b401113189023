//! Collection keys and payload limits

use std::fmt;

/// Key of the price-list document (currency rate, tiers, priced products)
pub const PRICE_LIST_KEY: &str = "global";

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Whole-document collections, each stored under one key as `{items, updatedAt, version}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Inventory ledger
    Ledger,
    /// Inventory catalog
    Catalog,
    /// Orders
    Orders,
    /// Shipments
    Shipments,
    /// Expenses
    Expenses,
    /// Sales
    Sales,
}

impl Collection {
    /// Every collection
    pub const ALL: [Collection; 6] = [
        Collection::Ledger,
        Collection::Catalog,
        Collection::Orders,
        Collection::Shipments,
        Collection::Expenses,
        Collection::Sales,
    ];

    /// Storage key
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Ledger => "inventory:ledger",
            Collection::Catalog => "inventory:products",
            Collection::Orders => "orders",
            Collection::Shipments => "shipments",
            Collection::Expenses => "expenses",
            Collection::Sales => "sales",
        }
    }

    /// Maximum number of items per document
    pub fn max_items(&self) -> usize {
        match self {
            Collection::Ledger => 20_000,
            Collection::Catalog => 10_000,
            Collection::Orders => 1_000,
            Collection::Shipments => 2_000,
            Collection::Expenses | Collection::Sales => 5_000,
        }
    }

    /// Maximum serialized size of `{"items": [...]}` in bytes
    pub fn max_bytes(&self) -> usize {
        match self {
            Collection::Ledger => 4 * MIB,
            Collection::Catalog => 2 * MIB,
            Collection::Orders | Collection::Shipments => 512 * KIB,
            Collection::Expenses | Collection::Sales => MIB,
        }
    }

    /// Plural noun used in "too many ..." messages
    fn noun(&self) -> &'static str {
        match self {
            Collection::Ledger => "ledger records",
            Collection::Catalog => "products",
            Collection::Orders => "orders",
            Collection::Shipments => "shipments",
            Collection::Expenses => "expenses",
            Collection::Sales => "sales",
        }
    }

    /// Message for a document with more than `max_items` items
    pub fn too_many_message(&self) -> String {
        format!("too many {} (max {})", self.noun(), self.max_items())
    }

    /// Message for a document over `max_bytes`
    pub fn too_large_message(&self) -> String {
        let max = self.max_bytes();
        let limit = if max % MIB == 0 {
            format!("{}MB", max / MIB)
        } else {
            format!("{}KB", max / KIB)
        };
        format!("payload too large (>{})", limit)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
