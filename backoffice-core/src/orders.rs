//! Order lifecycle state machine
//!
//! ```text
//! draft → confirmed → paid → packed → shipped → delivered
//!   └──────────┴────────┴───────┴─────────┴──────────┴──→ cancelled
//! ```
//!
//! Rules, in evaluation order:
//!
//! 1. `shipped` / `delivered` need a shipment id on the order
//!    (`MissingShipmentReference`), checked before anything else
//! 2. New orders (no stored status) may start in any status
//! 3. Re-saving the same status is a no-op
//! 4. `cancelled` is reachable from every status
//! 5. Otherwise the requested status must not be behind the stored one
//!    (`InvalidTransition`); skipping ahead is fine

use crate::{
    types::{EntityId, Order, OrderStatus},
    Error, Result,
};
use std::collections::HashMap;

/// Whether `current → requested` respects forward-only ordering.
///
/// `None` means the order has never been stored.
pub fn transition(current: Option<OrderStatus>, requested: OrderStatus) -> bool {
    let current = match current {
        None => return true,
        Some(status) => status,
    };

    if requested == current || requested == OrderStatus::Cancelled {
        return true;
    }

    match (current.sequence_index(), requested.sequence_index()) {
        (Some(from), Some(to)) => to >= from,
        // Leaving `cancelled` for anything else
        _ => false,
    }
}

/// Validate moving a stored order (status `current`) to the state in `order`
pub fn check_transition(current: Option<OrderStatus>, order: &Order) -> Result<()> {
    if order.status.requires_shipment() && !order.has_shipment() {
        return Err(Error::MissingShipmentReference {
            order_id: order.id.clone(),
            status: order.status,
        });
    }

    if !transition(current, order.status) {
        return Err(Error::InvalidTransition {
            order_id: order.id.clone(),
            // `transition` only rejects when a status is stored
            from: current.unwrap_or(OrderStatus::Draft),
            to: order.status,
        });
    }

    Ok(())
}

/// Move an order to `requested`, leaving it untouched on rejection
pub fn apply_status(order: &mut Order, requested: OrderStatus) -> Result<()> {
    let current = order.status;
    let candidate = Order {
        status: requested,
        ..order.clone()
    };

    check_transition(Some(current), &candidate)?;

    if current != requested {
        tracing::debug!(order_id = %order.id, from = %current, to = %requested, "Order status changed");
    }
    order.status = requested;
    Ok(())
}

/// Validate a whole-document write of the orders collection.
///
/// Each order in `next` is checked against the stored order with the same
/// id; ids not present in `previous` are new orders. The first violation is
/// returned.
pub fn reconcile_orders(previous: &[Order], next: &[Order]) -> Result<()> {
    let stored: HashMap<&EntityId, OrderStatus> =
        previous.iter().map(|o| (&o.id, o.status)).collect();

    for order in next {
        check_transition(stored.get(&order.id).copied(), order)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, shipment: Option<&str>) -> Order {
        Order {
            id: EntityId::new("o1"),
            status,
            shipment_id: shipment.map(EntityId::new),
            items: vec![],
            created_at: None,
            note: None,
        }
    }

    #[test]
    fn test_new_order_any_status() {
        for status in OrderStatus::ALL {
            assert!(transition(None, status));
        }
    }

    #[test]
    fn test_forward_skips_allowed() {
        assert!(transition(Some(OrderStatus::Draft), OrderStatus::Paid));
        assert!(transition(Some(OrderStatus::Confirmed), OrderStatus::Delivered));
    }

    #[test]
    fn test_backward_rejected() {
        assert!(!transition(Some(OrderStatus::Shipped), OrderStatus::Draft));
        assert!(!transition(Some(OrderStatus::Paid), OrderStatus::Confirmed));
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in OrderStatus::ALL {
            assert!(transition(Some(status), status));
        }
    }

    #[test]
    fn test_cancel_from_anywhere() {
        for status in OrderStatus::ALL {
            assert!(transition(Some(status), OrderStatus::Cancelled));
        }
    }

    #[test]
    fn test_cancelled_is_absorbing() {
        assert!(!transition(Some(OrderStatus::Cancelled), OrderStatus::Draft));
        assert!(!transition(Some(OrderStatus::Cancelled), OrderStatus::Delivered));
    }

    #[test]
    fn test_shipped_needs_shipment() {
        let err = check_transition(Some(OrderStatus::Packed), &order(OrderStatus::Shipped, None))
            .unwrap_err();
        assert!(matches!(err, Error::MissingShipmentReference { .. }));

        let err = check_transition(None, &order(OrderStatus::Delivered, Some("")))
            .unwrap_err();
        assert!(matches!(err, Error::MissingShipmentReference { .. }));

        assert!(check_transition(Some(OrderStatus::Packed), &order(OrderStatus::Shipped, Some("s1"))).is_ok());
    }

    #[test]
    fn test_shipment_checked_before_transition() {
        // delivered → shipped is backwards too, but the missing shipment wins
        let err = check_transition(Some(OrderStatus::Delivered), &order(OrderStatus::Shipped, None))
            .unwrap_err();
        assert!(matches!(err, Error::MissingShipmentReference { .. }));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = check_transition(Some(OrderStatus::Shipped), &order(OrderStatus::Confirmed, None))
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransition {
                order_id: EntityId::new("o1"),
                from: OrderStatus::Shipped,
                to: OrderStatus::Confirmed,
            }
        );
        assert!(err.is_transition_error());
    }

    #[test]
    fn test_apply_status_leaves_order_on_rejection() {
        let mut o = order(OrderStatus::Paid, None);
        assert!(apply_status(&mut o, OrderStatus::Draft).is_err());
        assert_eq!(o.status, OrderStatus::Paid);

        apply_status(&mut o, OrderStatus::Packed).unwrap();
        assert_eq!(o.status, OrderStatus::Packed);
    }

    #[test]
    fn test_reconcile_orders() {
        let previous = vec![order(OrderStatus::Paid, None)];

        let mut new_order = order(OrderStatus::Packed, None);
        new_order.id = EntityId::new("o2");

        let next = vec![order(OrderStatus::Packed, None), new_order];
        assert!(reconcile_orders(&previous, &next).is_ok());

        let next = vec![order(OrderStatus::Draft, None)];
        let err = reconcile_orders(&previous, &next).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }
}
