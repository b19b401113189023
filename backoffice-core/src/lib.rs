//! Back Office Core
//!
//! Derived-state engines for the freight & fulfilment back office.
//!
//! # Architecture
//!
//! - **Pricing**: landed cost of a product from price, quantity, currency rate and freight tier
//! - **Stock**: inventory ledger folded into per-product stock snapshots
//! - **Orders**: forward-only order status state machine
//! - **Stats**: dashboard KPIs rolled up from the collections
//!
//! Every engine is a synchronous pure function. Loading and persisting the
//! collection documents is the job of `backoffice-store`.
//!
//! # Invariants
//!
//! - Ledger is the source of truth: stock is always recomputed from it
//! - Derived stock is never negative
//! - Order status only moves forward, or to `cancelled`
//! - Money is exact decimal, rounded only for presentation

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod pricing;
pub mod stock;
pub mod orders;
pub mod stats;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    CatalogProduct, Currency, DeliveryOption, EntityId, EntryType, Expense, ExpenseType,
    LedgerEntry, Order, OrderItem, OrderStatus, PriceList, Product, Sale, SaleChannel, Shipment,
    ShipmentStatus, StockSnapshot,
};
pub use pricing::{compute_landed_cost, quote_catalog, CatalogQuote, LandedCost};
pub use stock::project;
pub use orders::{check_transition, reconcile_orders, transition};
pub use stats::{aggregate, DashboardStats};
