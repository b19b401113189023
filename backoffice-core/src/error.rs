//! Error types for the core engines

use crate::types::{EntityId, OrderStatus};
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
///
/// Only the order state machine fails. Pricing and stock projection are
/// total functions over sanitized input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Requested status moves backwards in the lifecycle
    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        /// Order being changed
        order_id: EntityId,
        /// Stored status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// Shipped/delivered order without a shipment id
    #[error("Order {order_id} cannot be {status} without a shipment reference")]
    MissingShipmentReference {
        /// Order being changed
        order_id: EntityId,
        /// Requested status
        status: OrderStatus,
    },

    /// Semantic validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this is a lifecycle rejection (as opposed to bad input)
    pub fn is_transition_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition { .. } | Error::MissingShipmentReference { .. }
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
