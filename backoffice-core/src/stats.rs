//! Dashboard KPIs rolled up from the collections
//!
//! Read-only: counts orders by status, shipments still moving, and the
//! RUB finance totals. Expense amounts are trusted as persisted; nothing is
//! re-converted with a live rate.

use crate::types::{Expense, Order, OrderStatus, Sale, Shipment};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Order counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    /// All orders
    pub total: u64,

    /// One entry per status, zero-filled
    pub by_status: BTreeMap<OrderStatus, u64>,
}

/// Shipment counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStats {
    /// Label printed, moving, or at customs
    pub in_transit: u64,

    /// All shipments
    pub total: u64,
}

/// Finance totals in RUB
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceStats {
    /// Sum of expenses
    #[serde(rename = "expensesRUB")]
    pub expenses_rub: Decimal,

    /// Sum of sales
    #[serde(rename = "salesRUB")]
    pub sales_rub: Decimal,

    /// Sales minus expenses (may be negative)
    #[serde(rename = "marginRUB")]
    pub margin_rub: Decimal,
}

/// Dashboard payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Orders
    pub orders: OrderStats,

    /// Shipments
    pub shipments: ShipmentStats,

    /// Finance
    pub finance: FinanceStats,
}

/// Roll the collections up into dashboard KPIs.
///
/// Missing collections are passed as empty slices.
pub fn aggregate(
    orders: &[Order],
    shipments: &[Shipment],
    expenses: &[Expense],
    sales: &[Sale],
) -> DashboardStats {
    let mut by_status: BTreeMap<OrderStatus, u64> =
        OrderStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for order in orders {
        *by_status.entry(order.status).or_insert(0) += 1;
    }

    let in_transit = shipments
        .iter()
        .filter(|s| s.status.is_in_transit())
        .count() as u64;

    let expenses_rub: Decimal = expenses.iter().map(|e| e.amount_rub).sum();
    let sales_rub: Decimal = sales.iter().map(|s| s.amount_rub).sum();

    DashboardStats {
        orders: OrderStats {
            total: orders.len() as u64,
            by_status,
        },
        shipments: ShipmentStats {
            in_transit,
            total: shipments.len() as u64,
        },
        finance: FinanceStats {
            expenses_rub,
            sales_rub,
            margin_rub: sales_rub - expenses_rub,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, EntityId, ExpenseType, ShipmentStatus};

    fn shipment(id: &str, status: ShipmentStatus) -> Shipment {
        Shipment {
            id: EntityId::new(id),
            carrier: "CDEK".to_string(),
            tracking_number: format!("TRK-{}", id),
            status,
            eta: None,
            cost_rub: None,
            checkpoints: vec![],
        }
    }

    fn expense(amount: i64, currency: Option<Currency>) -> Expense {
        Expense {
            id: EntityId::new("e"),
            expense_type: ExpenseType::Purchase,
            amount_rub: Decimal::from(amount),
            currency,
            rate: currency.map(|_| Decimal::from(13)),
            paid_at: None,
            note: None,
        }
    }

    fn sale(amount: i64) -> Sale {
        Sale {
            id: EntityId::new("s"),
            order_id: EntityId::new("o"),
            channel: None,
            amount_rub: Decimal::from(amount),
            paid_at: None,
        }
    }

    #[test]
    fn test_empty_collections_zero_filled() {
        let stats = aggregate(&[], &[], &[], &[]);

        assert_eq!(stats.orders.total, 0);
        assert_eq!(stats.orders.by_status.len(), 7);
        assert!(stats.orders.by_status.values().all(|&n| n == 0));
        assert_eq!(stats.finance.margin_rub, Decimal::ZERO);
    }

    #[test]
    fn test_order_counts() {
        let orders: Vec<Order> = [OrderStatus::Draft, OrderStatus::Paid, OrderStatus::Paid]
            .into_iter()
            .enumerate()
            .map(|(i, status)| Order {
                id: EntityId::new(i.to_string()),
                status,
                shipment_id: None,
                items: vec![],
                created_at: None,
                note: None,
            })
            .collect();

        let stats = aggregate(&orders, &[], &[], &[]);
        assert_eq!(stats.orders.total, 3);
        assert_eq!(stats.orders.by_status[&OrderStatus::Paid], 2);
        assert_eq!(stats.orders.by_status[&OrderStatus::Cancelled], 0);
    }

    #[test]
    fn test_in_transit_counts() {
        let shipments = vec![
            shipment("1", ShipmentStatus::Label),
            shipment("2", ShipmentStatus::InTransit),
            shipment("3", ShipmentStatus::Customs),
            shipment("4", ShipmentStatus::Delivered),
            shipment("5", ShipmentStatus::Lost),
            shipment("6", ShipmentStatus::Returned),
        ];

        let stats = aggregate(&[], &shipments, &[], &[]);
        assert_eq!(stats.shipments.in_transit, 3);
        assert_eq!(stats.shipments.total, 6);
    }

    #[test]
    fn test_negative_margin() {
        let expenses = vec![expense(700, None), expense(500, Some(Currency::CNY))];
        let sales = vec![sale(1000)];

        let stats = aggregate(&[], &[], &expenses, &sales);
        assert_eq!(stats.finance.expenses_rub, Decimal::from(1200));
        assert_eq!(stats.finance.sales_rub, Decimal::from(1000));
        assert_eq!(stats.finance.margin_rub, Decimal::from(-200));
    }

    #[test]
    fn test_serialized_shape() {
        let stats = aggregate(&[], &[], &[], &[sale(5)]);
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["orders"]["byStatus"].as_object().unwrap().len(), 7);
        assert_eq!(json["orders"]["byStatus"]["cancelled"], 0);
        assert_eq!(json["shipments"]["inTransit"], 0);
        assert_eq!(json["finance"]["salesRUB"], 5.0);
    }
}
