//! Core types for the back office
//!
//! All types are designed for:
//! - Lossless JSON round-trips of the stored collection documents (camelCase)
//! - Exact arithmetic (Decimal for money, weights and rates)
//! - Tolerant reads: ids may be stored as strings or numbers

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Record identifier (string or number in stored documents)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create new id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only ids count as missing
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> de::Visitor<'de> for IdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityId, E> {
                Ok(EntityId::new(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<EntityId, E> {
                Ok(EntityId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntityId, E> {
                Ok(EntityId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntityId, E> {
                Ok(EntityId(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<EntityId, E> {
                if v.is_finite() && v.fract() == 0.0 {
                    // `{:.0}` keeps every digit; an integer cast would saturate
                    Ok(EntityId(format!("{:.0}", v)))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<EntityId, E> {
                Ok(EntityId::default())
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Point in time as stored by the UI: epoch milliseconds or a date string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since Unix epoch
    Millis(i64),
    /// ISO 8601 date or date-time
    Text(String),
}

/// Currency of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Russian Rouble (reporting currency)
    RUB,
    /// Chinese Yuan (purchase currency)
    CNY,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::RUB => "RUB",
            Currency::CNY => "CNY",
        }
    }

    /// Parse from ISO code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "RUB" => Some(Currency::RUB),
            "CNY" => Some(Currency::CNY),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Priced product on the freight calculator sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID
    pub id: EntityId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Source listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Unit purchase price in CNY
    #[serde(default)]
    pub unit_price_yuan: Decimal,

    /// Unit weight in kilograms
    #[serde(default)]
    pub weight_kg: Decimal,

    /// Units ordered
    #[serde(default)]
    pub quantity: u32,

    /// Freight tier by name (empty = none)
    #[serde(default)]
    pub delivery_option_name: String,

    /// Freight tier by immutable id (preferred over the name when present)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_option_id: Option<EntityId>,
}

/// Freight tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOption {
    /// Immutable tier id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    /// Tier name (unique within the list)
    pub name: String,

    /// Flat fee per shipment line
    #[serde(rename = "baseFeeRUB", default)]
    pub base_fee_rub: Decimal,

    /// Rate per billable kilogram
    #[serde(rename = "pricePerKgRUB", default)]
    pub price_per_kg_rub: Decimal,

    /// Floor for the per-kg component
    #[serde(rename = "minChargeRUB", default)]
    pub min_charge_rub: Decimal,

    /// Minimum billable weight
    #[serde(default)]
    pub min_weight_kg: Decimal,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The `global` document: currency rate, freight tiers and priced products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceList {
    /// RUB per CNY
    pub currency_rate: Decimal,

    /// Freight tiers
    pub delivery_options: Vec<DeliveryOption>,

    /// Priced products
    pub products: Vec<Product>,
}

impl PriceList {
    /// Rate used when no document has been saved yet
    pub const DEFAULT_CURRENCY_RATE: Decimal = Decimal::from_parts(13, 0, 0, false, 0);
}

impl Default for PriceList {
    fn default() -> Self {
        Self {
            currency_rate: Self::DEFAULT_CURRENCY_RATE,
            delivery_options: Vec::new(),
            products: Vec::new(),
        }
    }
}

/// Catalog entry backing the inventory ledger UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    /// Product ID
    pub id: EntityId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Purchase price in CNY
    #[serde(rename = "purchasePriceCNY", default, skip_serializing_if = "Option::is_none")]
    pub purchase_price_cny: Option<Decimal>,

    /// Unit weight in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_weight_kg: Option<Decimal>,
}

/// Stock movement kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Goods received
    In,
    /// Goods dispatched
    Out,
    /// Goods held for an order
    Reserve,
    /// Hold lifted
    Release,
    /// Any other literal found in a stored ledger; skipped by projection
    #[serde(other)]
    #[default]
    Unrecognized,
}

impl EntryType {
    /// Literal as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::In => "in",
            EntryType::Out => "out",
            EntryType::Reserve => "reserve",
            EntryType::Release => "release",
            EntryType::Unrecognized => "unrecognized",
        }
    }

    /// Movement that cancels this one
    pub fn reversed(&self) -> Option<Self> {
        match self {
            EntryType::In => Some(EntryType::Out),
            EntryType::Out => Some(EntryType::In),
            EntryType::Reserve => Some(EntryType::Release),
            EntryType::Release => Some(EntryType::Reserve),
            EntryType::Unrecognized => None,
        }
    }
}

/// Field value, or its default when it does not decode as `T`
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: de::DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Quantity as a number or numeric string; anything else (null, text,
/// out of range) reads as zero, which projection skips
fn lenient_qty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let qty = match &value {
        serde_json::Value::String(text) => text.trim().parse::<Decimal>().ok(),
        serde_json::Value::Number(_) => <Decimal as Deserialize>::deserialize(value).ok(),
        _ => None,
    };
    Ok(qty.unwrap_or_default())
}

/// Inventory ledger fact.
///
/// Stored ledgers hold rows written by older, looser clients. Every field
/// decodes leniently so one bad row reads as malformed (and is skipped by
/// projection) instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Entry ID
    #[serde(default, deserialize_with = "lenient")]
    pub id: EntityId,

    /// When the movement happened (`ts` in older documents)
    #[serde(
        default,
        alias = "ts",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Timestamp>,

    /// Product moved
    #[serde(default, deserialize_with = "lenient")]
    pub product_id: EntityId,

    /// Movement kind
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub entry_type: EntryType,

    /// Units moved (positive integer in well-formed rows)
    #[serde(default, deserialize_with = "lenient_qty")]
    pub qty: Decimal,

    /// Free-form note
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
}

/// Current stock of one product, derived from the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    /// Product ID
    pub product_id: EntityId,

    /// On hand and not reserved
    pub available: i64,

    /// Reserved and not released
    pub reserved: i64,

    /// Cumulative receipts
    pub total_in: i64,

    /// Cumulative dispatches
    pub total_out: i64,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Being assembled
    Draft,
    /// Accepted by the customer
    Confirmed,
    /// Payment received
    Paid,
    /// Packed for dispatch
    Packed,
    /// Handed to a carrier
    Shipped,
    /// Received by the customer
    Delivered,
    /// Cancelled (absorbing)
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Draft,
        OrderStatus::Confirmed,
        OrderStatus::Paid,
        OrderStatus::Packed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Position in the forward sequence (`None` for cancelled)
    pub fn sequence_index(&self) -> Option<usize> {
        match self {
            OrderStatus::Draft => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Paid => Some(2),
            OrderStatus::Packed => Some(3),
            OrderStatus::Shipped => Some(4),
            OrderStatus::Delivered => Some(5),
            OrderStatus::Cancelled => None,
        }
    }

    /// Statuses that need a shipment on the order
    pub fn requires_shipment(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Literal as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product ordered
    #[serde(default)]
    pub product_id: EntityId,

    /// Units ordered
    #[serde(default)]
    pub qty: Decimal,
}

/// Customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID
    pub id: EntityId,

    /// Lifecycle status
    pub status: OrderStatus,

    /// Linked shipment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<EntityId>,

    /// Lines
    #[serde(default)]
    pub items: Vec<OrderItem>,

    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Order {
    /// Whether a non-empty shipment id is linked
    pub fn has_shipment(&self) -> bool {
        self.shipment_id.as_ref().is_some_and(|id| !id.is_blank())
    }
}

/// Shipment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Label printed
    Label,
    /// Moving
    InTransit,
    /// Held at customs
    Customs,
    /// Arrived
    Delivered,
    /// Lost by the carrier
    Lost,
    /// Sent back
    Returned,
}

impl ShipmentStatus {
    /// Still on its way (counts towards the dashboard's in-transit figure)
    pub fn is_in_transit(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Label | ShipmentStatus::InTransit | ShipmentStatus::Customs
        )
    }
}

/// Carrier tracking checkpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Checkpoint {
    /// When it was scanned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,

    /// Where it was scanned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Carrier status text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Outbound shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    /// Shipment ID
    pub id: EntityId,

    /// Carrier name
    #[serde(default)]
    pub carrier: String,

    /// Carrier tracking number
    #[serde(default)]
    pub tracking_number: String,

    /// Tracking status
    pub status: ShipmentStatus,

    /// Expected arrival
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<Timestamp>,

    /// Shipping cost
    #[serde(rename = "costRUB", default, skip_serializing_if = "Option::is_none")]
    pub cost_rub: Option<Decimal>,

    /// Tracking history
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<Checkpoint>,
}

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    /// Goods purchase
    Purchase,
    /// Freight
    Shipping,
    /// Platform or bank fee
    Fee,
    /// Anything else
    Other,
}

/// Expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Expense ID
    pub id: EntityId,

    /// Category
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,

    /// Amount already expressed in RUB
    #[serde(rename = "amountRUB", default)]
    pub amount_rub: Decimal,

    /// Original currency (RUB when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// RUB per unit of the original currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,

    /// Payment time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,

    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Sales channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleChannel {
    /// Marketplace listing
    Marketplace,
    /// Direct sale
    Direct,
    /// Anything else
    Other,
}

/// Sale record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Sale ID
    pub id: EntityId,

    /// Order the sale settles
    #[serde(default)]
    pub order_id: EntityId,

    /// Channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<SaleChannel>,

    /// Amount in RUB
    #[serde(rename = "amountRUB", default)]
    pub amount_rub: Decimal,

    /// Payment time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
}
