//! Stock projection from the inventory ledger
//!
//! The ledger is the source of truth. Stock is never stored or cached: every
//! read folds the full entry list again, so the result is reproducible from
//! the ledger alone.
//!
//! Per product:
//!
//! ```text
//! reserved  = max(0, Σreserve − Σrelease)
//! available = max(0, (Σin − Σout) − reserved)
//! ```
//!
//! Malformed rows (non-positive or fractional qty, blank product, unknown
//! type) are skipped so one bad historical row never hides the rest of the
//! catalog.

use crate::types::{EntityId, EntryType, LedgerEntry, StockSnapshot, Timestamp};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{BTreeMap, HashMap};

/// Running sums for one product
#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    total_in: i64,
    total_out: i64,
    total_reserve: i64,
    total_release: i64,
}

impl Totals {
    fn add(&mut self, entry_type: EntryType, qty: i64) {
        match entry_type {
            EntryType::In => self.total_in = self.total_in.saturating_add(qty),
            EntryType::Out => self.total_out = self.total_out.saturating_add(qty),
            EntryType::Reserve => self.total_reserve = self.total_reserve.saturating_add(qty),
            EntryType::Release => self.total_release = self.total_release.saturating_add(qty),
            EntryType::Unrecognized => {}
        }
    }

    fn snapshot(&self, product_id: EntityId) -> StockSnapshot {
        let reserved = self.total_reserve.saturating_sub(self.total_release).max(0);
        let on_hand = self.total_in.saturating_sub(self.total_out);
        StockSnapshot {
            product_id,
            available: on_hand.saturating_sub(reserved).max(0),
            reserved,
            total_in: self.total_in,
            total_out: self.total_out,
        }
    }
}

/// Quantity of a well-formed row, `None` if the row must be skipped
fn usable_qty(entry: &LedgerEntry) -> Option<i64> {
    if entry.product_id.is_blank() || entry.entry_type == EntryType::Unrecognized {
        return None;
    }
    if entry.qty <= rust_decimal::Decimal::ZERO || !entry.qty.fract().is_zero() {
        return None;
    }
    entry.qty.to_i64()
}

/// Project the ledger into one snapshot per product, sorted by product id
pub fn project(entries: &[LedgerEntry]) -> Vec<StockSnapshot> {
    let mut totals: BTreeMap<&EntityId, Totals> = BTreeMap::new();
    let mut skipped = 0usize;

    for entry in entries {
        match usable_qty(entry) {
            Some(qty) => totals
                .entry(&entry.product_id)
                .or_default()
                .add(entry.entry_type, qty),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, total = entries.len(), "Skipped malformed ledger rows");
    }

    totals
        .into_iter()
        .map(|(product_id, t)| t.snapshot(product_id.clone()))
        .collect()
}

/// Snapshot of a single product (zeroed when it has no usable rows)
pub fn project_product(entries: &[LedgerEntry], product_id: &EntityId) -> StockSnapshot {
    let mut totals = Totals::default();
    for entry in entries.iter().filter(|e| &e.product_id == product_id) {
        if let Some(qty) = usable_qty(entry) {
            totals.add(entry.entry_type, qty);
        }
    }
    totals.snapshot(product_id.clone())
}

/// Number of rows `project` would skip
pub fn count_malformed(entries: &[LedgerEntry]) -> usize {
    entries.iter().filter(|e| usable_qty(e).is_none()).count()
}

/// Entry that reverses `entry` (in ↔ out, reserve ↔ release).
///
/// Appending it instead of editing history keeps the ledger auditable.
/// Returns `None` for entries with an unrecognised type.
pub fn compensating_entry(
    entry: &LedgerEntry,
    id: EntityId,
    date: Option<Timestamp>,
) -> Option<LedgerEntry> {
    let entry_type = entry.entry_type.reversed()?;
    Some(LedgerEntry {
        id,
        date,
        product_id: entry.product_id.clone(),
        entry_type,
        qty: entry.qty,
        note: Some(format!("reverses {}", entry.id)),
    })
}

/// Ids of entries in `previous` that `next` edits or drops.
///
/// Whole-document writes may rewrite history; callers use this to flag it.
pub fn rewritten_entries(previous: &[LedgerEntry], next: &[LedgerEntry]) -> Vec<EntityId> {
    let next_by_id: HashMap<&EntityId, &LedgerEntry> = next.iter().map(|e| (&e.id, e)).collect();

    previous
        .iter()
        .filter(|old| match next_by_id.get(&old.id) {
            Some(new) => {
                new.product_id != old.product_id
                    || new.entry_type != old.entry_type
                    || new.qty != old.qty
            }
            None => true,
        })
        .map(|old| old.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn entry(id: &str, product: &str, entry_type: EntryType, qty: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: EntityId::new(id),
            date: None,
            product_id: EntityId::new(product),
            entry_type,
            qty,
            note: None,
        }
    }

    fn n(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_basic_projection() {
        let ledger = vec![
            entry("1", "A", EntryType::In, n(10)),
            entry("2", "A", EntryType::Out, n(3)),
            entry("3", "A", EntryType::Reserve, n(4)),
            entry("4", "A", EntryType::Release, n(1)),
        ];

        let stock = project(&ledger);
        assert_eq!(stock.len(), 1);
        assert_eq!(
            stock[0],
            StockSnapshot {
                product_id: EntityId::new("A"),
                available: 4,
                reserved: 3,
                total_in: 10,
                total_out: 3,
            }
        );
    }

    #[test]
    fn test_over_reservation_clamps_to_zero() {
        let ledger = vec![
            entry("1", "A", EntryType::In, n(2)),
            entry("2", "A", EntryType::Reserve, n(5)),
            entry("3", "B", EntryType::Out, n(3)),
            entry("4", "C", EntryType::Release, n(7)),
        ];

        let stock = project(&ledger);
        assert_eq!(stock[0].available, 0);
        assert_eq!(stock[0].reserved, 5);
        assert_eq!(stock[1].available, 0);
        assert_eq!(stock[2].reserved, 0);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let ledger = vec![
            entry("1", "A", EntryType::In, n(5)),
            entry("2", "A", EntryType::In, n(-2)),
            entry("3", "A", EntryType::In, Decimal::new(15, 1)),
            entry("4", "", EntryType::In, n(9)),
            entry("5", "A", EntryType::Unrecognized, n(9)),
            entry("6", "A", EntryType::Out, Decimal::ZERO),
        ];

        let stock = project(&ledger);
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].total_in, 5);
        assert_eq!(stock[0].total_out, 0);
        assert_eq!(count_malformed(&ledger), 5);
    }

    #[test]
    fn test_sorted_by_product() {
        let ledger = vec![
            entry("1", "C", EntryType::In, n(1)),
            entry("2", "A", EntryType::In, n(1)),
            entry("3", "B", EntryType::In, n(1)),
        ];

        let ids: Vec<_> = project(&ledger)
            .into_iter()
            .map(|s| s.product_id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_project_product_without_rows() {
        let snapshot = project_product(&[], &EntityId::new("X"));
        assert_eq!(snapshot.available, 0);
        assert_eq!(snapshot.product_id.as_str(), "X");
    }

    #[test]
    fn test_compensating_entry_cancels_out() {
        let original = entry("1", "A", EntryType::Reserve, n(4));
        let reversal = compensating_entry(&original, EntityId::new("2"), None).unwrap();
        assert_eq!(reversal.entry_type, EntryType::Release);

        let ledger = vec![entry("0", "A", EntryType::In, n(10)), original, reversal];
        let stock = project_product(&ledger, &EntityId::new("A"));
        assert_eq!(stock.reserved, 0);
        assert_eq!(stock.available, 10);
    }

    #[test]
    fn test_rewritten_entries() {
        let previous = vec![
            entry("1", "A", EntryType::In, n(10)),
            entry("2", "A", EntryType::Out, n(2)),
            entry("3", "A", EntryType::Out, n(1)),
        ];
        let mut next = previous.clone();
        next[1].qty = n(1);
        next.remove(2);
        next.push(entry("4", "A", EntryType::In, n(5)));

        let ids = rewritten_entries(&previous, &next);
        assert_eq!(ids, vec![EntityId::new("2"), EntityId::new("3")]);
    }
}
