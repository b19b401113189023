//! Payload validation before persisting
//!
//! Records arrive already typed, so unknown status literals and wrong JSON
//! types fail at deserialization ([`parse_items`]). What remains are the
//! semantic checks: required ids and names, positive integer quantities,
//! non-negative money, parseable dates, per-collection size limits.
//!
//! Messages name the first offending record as `item[i].field ...`.

use crate::{collection::Collection, document::ItemList, Error, Result};
use backoffice_core::types::{
    CatalogProduct, Currency, EntityId, EntryType, Expense, LedgerEntry, Order, PriceList, Sale,
    Shipment, Timestamp,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Semantic checks for one record at position `idx`
pub trait Validate {
    /// First problem found, as a user-facing message
    fn check(&self, idx: usize) -> std::result::Result<(), String>;
}

/// Date-time of a stored timestamp, `None` when unparseable
pub fn parse_timestamp(ts: &Timestamp) -> Option<DateTime<Utc>> {
    match ts {
        Timestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
        Timestamp::Text(text) => {
            let text = text.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                    return Some(dt.and_utc());
                }
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
    }
}

fn require_id(id: &EntityId, idx: usize, field: &str) -> std::result::Result<(), String> {
    if id.is_blank() {
        return Err(format!("item[{}].{} required", idx, field));
    }
    Ok(())
}

fn require_text(text: &str, idx: usize, field: &str) -> std::result::Result<(), String> {
    if text.trim().is_empty() {
        return Err(format!("item[{}].{} required", idx, field));
    }
    Ok(())
}

fn non_negative(value: Decimal, idx: usize, field: &str) -> std::result::Result<(), String> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(format!("item[{}].{} invalid", idx, field));
    }
    Ok(())
}

fn optional_date(
    ts: Option<&Timestamp>,
    idx: usize,
    field: &str,
    suffix: &str,
) -> std::result::Result<(), String> {
    match ts {
        Some(ts) if parse_timestamp(ts).is_none() => {
            Err(format!("item[{}].{} {}", idx, field, suffix))
        }
        _ => Ok(()),
    }
}

fn is_positive_integer(qty: Decimal) -> bool {
    qty > Decimal::ZERO && qty.fract().is_zero()
}

impl Validate for LedgerEntry {
    fn check(&self, idx: usize) -> std::result::Result<(), String> {
        require_id(&self.id, idx, "id")?;
        require_id(&self.product_id, idx, "productId")?;
        if self.entry_type == EntryType::Unrecognized {
            return Err(format!("item[{}].type invalid", idx));
        }
        if !is_positive_integer(self.qty) {
            return Err(format!("item[{}].qty invalid", idx));
        }
        optional_date(self.date.as_ref(), idx, "date", "invalid")
    }
}

impl Validate for CatalogProduct {
    fn check(&self, idx: usize) -> std::result::Result<(), String> {
        require_id(&self.id, idx, "id")?;
        require_text(&self.name, idx, "name")?;
        if let Some(price) = self.purchase_price_cny {
            non_negative(price, idx, "purchasePriceCNY")?;
        }
        if let Some(weight) = self.unit_weight_kg {
            non_negative(weight, idx, "unitWeightKg")?;
        }
        Ok(())
    }
}

impl Validate for Order {
    fn check(&self, idx: usize) -> std::result::Result<(), String> {
        require_id(&self.id, idx, "id")?;
        for (j, item) in self.items.iter().enumerate() {
            if item.product_id.is_blank() {
                return Err(format!("item[{}].items[{}].productId required", idx, j));
            }
            if item.qty <= Decimal::ZERO {
                return Err(format!("item[{}].items[{}].qty invalid", idx, j));
            }
        }
        optional_date(self.created_at.as_ref(), idx, "createdAt", "invalid")
    }
}

impl Validate for Shipment {
    fn check(&self, idx: usize) -> std::result::Result<(), String> {
        require_id(&self.id, idx, "id")?;
        require_text(&self.carrier, idx, "carrier")?;
        require_text(&self.tracking_number, idx, "trackingNumber")?;
        if let Some(cost) = self.cost_rub {
            non_negative(cost, idx, "costRUB")?;
        }
        optional_date(self.eta.as_ref(), idx, "eta", "invalid date")?;
        for (j, checkpoint) in self.checkpoints.iter().enumerate() {
            if let Some(date) = &checkpoint.date {
                if parse_timestamp(date).is_none() {
                    return Err(format!("item[{}].checkpoints[{}].date invalid", idx, j));
                }
            }
        }
        Ok(())
    }
}

impl Validate for Expense {
    fn check(&self, idx: usize) -> std::result::Result<(), String> {
        require_id(&self.id, idx, "id")?;
        non_negative(self.amount_rub, idx, "amountRUB")?;
        if self.currency == Some(Currency::CNY)
            && !self.rate.is_some_and(|rate| rate > Decimal::ZERO)
        {
            return Err(format!("item[{}].rate required for CNY", idx));
        }
        if let Some(rate) = self.rate {
            if rate <= Decimal::ZERO {
                return Err(format!("item[{}].rate invalid", idx));
            }
        }
        optional_date(self.paid_at.as_ref(), idx, "paidAt", "invalid")
    }
}

impl Validate for Sale {
    fn check(&self, idx: usize) -> std::result::Result<(), String> {
        require_id(&self.id, idx, "id")?;
        require_id(&self.order_id, idx, "orderId")?;
        non_negative(self.amount_rub, idx, "amountRUB")?;
        optional_date(self.paid_at.as_ref(), idx, "paidAt", "invalid")
    }
}

/// Check a whole collection document before it is written
pub fn validate_items<T: Validate + Serialize>(collection: Collection, items: &[T]) -> Result<()> {
    validate_appended(collection, items, 0)
}

/// Check a document whose records from `start` on are new.
///
/// Records before `start` are already stored and are not re-checked; they
/// only count towards the limits and the id uniqueness of the new records.
pub fn validate_appended<T: Validate + Serialize>(
    collection: Collection,
    items: &[T],
    start: usize,
) -> Result<()> {
    if items.len() > collection.max_items() {
        return Err(Error::Validation(collection.too_many_message()));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let is_new = idx >= start;
        if is_new {
            item.check(idx).map_err(Error::Validation)?;
        }
        // Id uniqueness is checked on the serialized id so every record type shares it
        if let Value::Object(fields) = serde_json::to_value(item)? {
            if let Some(id) = fields.get("id") {
                if !seen.insert(id.to_string()) && is_new {
                    return Err(Error::Validation(format!("item[{}].id duplicate", idx)));
                }
            }
        }
    }

    let size = serde_json::to_vec(&ItemList {
        items: items.iter().collect::<Vec<_>>(),
    })?
    .len();
    if size > collection.max_bytes() {
        return Err(Error::Validation(collection.too_large_message()));
    }

    Ok(())
}

/// Decode and validate the `items` array of an incoming request body
pub fn parse_items<T>(collection: Collection, items: &Value) -> Result<Vec<T>>
where
    T: Validate + Serialize + DeserializeOwned,
{
    let raw = items
        .as_array()
        .ok_or_else(|| Error::Validation("items must be an array".to_string()))?;
    if raw.len() > collection.max_items() {
        return Err(Error::Validation(collection.too_many_message()));
    }

    let mut parsed = Vec::with_capacity(raw.len());
    for (idx, item) in raw.iter().enumerate() {
        if !item.is_object() {
            return Err(Error::Validation(format!("item[{}] must be object", idx)));
        }
        let record: T = serde_json::from_value(item.clone())
            .map_err(|e| Error::Validation(format!("item[{}] invalid: {}", idx, e)))?;
        parsed.push(record);
    }

    validate_items(collection, &parsed)?;
    Ok(parsed)
}

/// Check the price-list document before it is written
pub fn validate_price_list(list: &PriceList) -> Result<()> {
    if list.currency_rate <= Decimal::ZERO {
        return Err(Error::Validation("currencyRate invalid".to_string()));
    }

    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for (idx, option) in list.delivery_options.iter().enumerate() {
        let name = option.name.trim();
        if name.is_empty() {
            return Err(Error::Validation(format!(
                "deliveryOptions[{}].name required",
                idx
            )));
        }
        if !names.insert(name) {
            return Err(Error::Validation(format!(
                "deliveryOptions[{}].name duplicate",
                idx
            )));
        }
        if let Some(id) = &option.id {
            if !id.is_blank() && !ids.insert(id) {
                return Err(Error::Validation(format!(
                    "deliveryOptions[{}].id duplicate",
                    idx
                )));
            }
        }
        for (field, value) in [
            ("baseFeeRUB", option.base_fee_rub),
            ("pricePerKgRUB", option.price_per_kg_rub),
            ("minChargeRUB", option.min_charge_rub),
            ("minWeightKg", option.min_weight_kg),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(Error::Validation(format!(
                    "deliveryOptions[{}].{} invalid",
                    idx, field
                )));
            }
        }
    }

    for (idx, product) in list.products.iter().enumerate() {
        if product.id.is_blank() {
            return Err(Error::Validation(format!("products[{}].id required", idx)));
        }
        if product.quantity == 0 {
            return Err(Error::Validation(format!("products[{}].quantity invalid", idx)));
        }
        for (field, value) in [
            ("unitPriceYuan", product.unit_price_yuan),
            ("weightKg", product.weight_kg),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(Error::Validation(format!(
                    "products[{}].{} invalid",
                    idx, field
                )));
            }
        }
    }

    Ok(())
}
