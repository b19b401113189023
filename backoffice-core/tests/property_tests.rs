//! Property-based tests for the derived-state engines
//!
//! These tests use proptest to verify:
//! - Stock non-negativity: available ≥ 0 and reserved ≥ 0 for any ledger
//! - Deterministic replay: same ledger → same snapshots
//! - Commutativity: reordering the ledger does not change the snapshots
//! - Forward-only order lifecycle, with cancellation always allowed
//! - Freight minimum charge applies to the per-kg component only

use backoffice_core::{
    compute_landed_cost, project,
    stock::project_product,
    transition,
    types::{DeliveryOption, EntityId, EntryType, LedgerEntry, OrderStatus, Product},
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for ledger entry types (malformed literal included)
fn entry_type_strategy() -> impl Strategy<Value = EntryType> {
    prop_oneof![
        4 => Just(EntryType::In),
        3 => Just(EntryType::Out),
        3 => Just(EntryType::Reserve),
        2 => Just(EntryType::Release),
        1 => Just(EntryType::Unrecognized),
    ]
}

/// Strategy for quantities, including zero, negative and fractional rows
fn qty_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        8 => (1i64..500).prop_map(Decimal::from),
        1 => (-50i64..=0).prop_map(Decimal::from),
        1 => (1i64..5000).prop_map(|tenths| Decimal::new(tenths, 1)),
    ]
}

/// Strategy for ledger entries over a small product set
fn entry_strategy() -> impl Strategy<Value = LedgerEntry> {
    (
        0u32..10_000,
        prop_oneof![Just(""), Just("A"), Just("B"), Just("C"), Just("D")],
        entry_type_strategy(),
        qty_strategy(),
    )
        .prop_map(|(id, product, entry_type, qty)| LedgerEntry {
            id: EntityId::new(id.to_string()),
            date: None,
            product_id: EntityId::new(product),
            entry_type,
            qty,
            note: None,
        })
}

/// Strategy for order statuses
fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop::sample::select(OrderStatus::ALL.to_vec())
}

/// Strategy for non-negative money/weight with two decimals
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: derived stock is never negative
    #[test]
    fn prop_stock_non_negative(ledger in prop::collection::vec(entry_strategy(), 0..200)) {
        for snapshot in project(&ledger) {
            prop_assert!(snapshot.available >= 0);
            prop_assert!(snapshot.reserved >= 0);
            prop_assert!(!snapshot.product_id.is_blank());
        }
    }

    /// Property: projecting twice yields identical snapshots
    #[test]
    fn prop_projection_idempotent(ledger in prop::collection::vec(entry_strategy(), 0..200)) {
        prop_assert_eq!(project(&ledger), project(&ledger));
    }

    /// Property: order of ledger rows does not matter
    #[test]
    fn prop_projection_commutative(
        (ledger, shuffled) in prop::collection::vec(entry_strategy(), 0..100)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        prop_assert_eq!(project(&ledger), project(&shuffled));
    }

    /// Property: single-product projection agrees with the full projection
    #[test]
    fn prop_project_product_matches(ledger in prop::collection::vec(entry_strategy(), 0..100)) {
        for snapshot in project(&ledger) {
            prop_assert_eq!(project_product(&ledger, &snapshot.product_id), snapshot);
        }
    }

    /// Property: available + reserved never exceeds net receipts when receipts cover reservations
    #[test]
    fn prop_available_bounded(ledger in prop::collection::vec(entry_strategy(), 0..100)) {
        for s in project(&ledger) {
            let net = s.total_in - s.total_out;
            if net >= s.reserved {
                prop_assert_eq!(s.available + s.reserved, net);
            } else {
                prop_assert_eq!(s.available, 0);
            }
        }
    }

    /// Property: cancellation is reachable from every status
    #[test]
    fn prop_cancel_always_allowed(current in status_strategy()) {
        prop_assert!(transition(Some(current), OrderStatus::Cancelled));
    }

    /// Property: transitions between lifecycle statuses are allowed iff not backwards
    #[test]
    fn prop_forward_only(current in status_strategy(), requested in status_strategy()) {
        let allowed = transition(Some(current), requested);
        match (current.sequence_index(), requested.sequence_index()) {
            (Some(from), Some(to)) => prop_assert_eq!(allowed, to >= from),
            (None, _) => prop_assert_eq!(allowed, requested == OrderStatus::Cancelled),
            (Some(_), None) => prop_assert!(allowed),
        }
    }

    /// Property: freight = base fee + max(per-kg × billable weight, min charge)
    #[test]
    fn prop_freight_formula(
        base in amount_strategy(),
        per_kg in amount_strategy(),
        min_charge in amount_strategy(),
        min_weight in (0i64..5000).prop_map(|g| Decimal::new(g, 3)),
        weight in (0i64..5000).prop_map(|g| Decimal::new(g, 3)),
        quantity in 0u32..100,
        price in amount_strategy(),
    ) {
        let tier = DeliveryOption {
            id: None,
            name: "Tier".to_string(),
            base_fee_rub: base,
            price_per_kg_rub: per_kg,
            min_charge_rub: min_charge,
            min_weight_kg: min_weight,
            description: None,
        };
        let product = Product {
            id: EntityId::new("p"),
            name: String::new(),
            url: None,
            unit_price_yuan: price,
            weight_kg: weight,
            quantity,
            delivery_option_name: "Tier".to_string(),
            delivery_option_id: None,
        };

        let cost = compute_landed_cost(&product, &[tier], Decimal::from(13));
        let billable = (weight * Decimal::from(quantity)).max(min_weight);

        prop_assert_eq!(cost.billable_weight_kg, billable);
        prop_assert_eq!(cost.freight_cost, base + (per_kg * billable).max(min_charge));
        prop_assert!(cost.freight_cost >= base + min_charge);
        prop_assert_eq!(cost.total, cost.goods_cost + cost.freight_cost);
    }
}
