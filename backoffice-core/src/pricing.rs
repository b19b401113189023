//! Freight pricing
//!
//! Landed cost of a product line in RUB:
//!
//! ```text
//! goods   = unitPriceYuan × quantity × currencyRate
//! weight  = max(weightKg × quantity, tier.minWeightKg)
//! freight = tier.baseFeeRUB + max(tier.pricePerKgRUB × weight, tier.minChargeRUB)
//! total   = goods + freight
//! ```
//!
//! The minimum charge floors the per-kg component only; the base fee is
//! added after the max. Arithmetic is exact `Decimal` throughout and values
//! are rounded only when a result is presented (`rounded()`).

use crate::{
    types::{DeliveryOption, EntityId, PriceList, Product},
    Error, Result,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Decimal places for money in presented results
const MONEY_DP: u32 = 2;

/// Decimal places for weights in presented results
const WEIGHT_DP: u32 = 3;

fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Landed cost breakdown of one product line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandedCost {
    /// Goods value in RUB
    pub goods_cost: Decimal,

    /// Freight in RUB (zero without a tier)
    pub freight_cost: Decimal,

    /// Goods plus freight
    pub total: Decimal,

    /// Weight the freight was billed on
    pub billable_weight_kg: Decimal,
}

impl LandedCost {
    /// Presentation copy: money to 2 dp, weight to 3 dp
    pub fn rounded(&self) -> Self {
        Self {
            goods_cost: round_to(self.goods_cost, MONEY_DP),
            freight_cost: round_to(self.freight_cost, MONEY_DP),
            total: round_to(self.total, MONEY_DP),
            billable_weight_kg: round_to(self.billable_weight_kg, WEIGHT_DP),
        }
    }
}

/// Resolve the freight tier a product points at.
///
/// An id reference wins when both sides carry ids; otherwise the tier is
/// matched by exact name. An empty or dangling reference resolves to `None`.
pub fn find_delivery_option<'a>(
    product: &Product,
    options: &'a [DeliveryOption],
) -> Option<&'a DeliveryOption> {
    if let Some(id) = product.delivery_option_id.as_ref().filter(|id| !id.is_blank()) {
        if let Some(option) = options.iter().find(|o| o.id.as_ref() == Some(id)) {
            return Some(option);
        }
    }

    if product.delivery_option_name.is_empty() {
        return None;
    }

    options
        .iter()
        .find(|o| o.name == product.delivery_option_name)
}

/// Compute the landed cost of a product line
pub fn compute_landed_cost(
    product: &Product,
    options: &[DeliveryOption],
    currency_rate: Decimal,
) -> LandedCost {
    let quantity = Decimal::from(product.quantity);
    let goods_cost = product.unit_price_yuan * quantity * currency_rate;
    let shipped_weight = product.weight_kg * quantity;

    let (freight_cost, billable_weight_kg) = match find_delivery_option(product, options) {
        Some(tier) => {
            let weight = shipped_weight.max(tier.min_weight_kg);
            let per_kg = (tier.price_per_kg_rub * weight).max(tier.min_charge_rub);
            (tier.base_fee_rub + per_kg, weight)
        }
        None => (Decimal::ZERO, shipped_weight),
    };

    LandedCost {
        goods_cost,
        freight_cost,
        total: goods_cost + freight_cost,
        billable_weight_kg,
    }
}

/// One priced line of a catalog quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    /// Product ID
    pub product_id: EntityId,

    /// Product name
    pub name: String,

    /// Tier the line was priced with (empty if none resolved)
    pub delivery_option_name: String,

    /// Cost breakdown
    #[serde(flatten)]
    pub cost: LandedCost,
}

/// Every product of a price list, priced, with sheet totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuote {
    /// Rate the quote was computed with
    pub currency_rate: Decimal,

    /// Per-product lines, in price-list order
    pub lines: Vec<QuoteLine>,

    /// Sum of goods costs
    pub total_goods: Decimal,

    /// Sum of freight costs
    pub total_freight: Decimal,

    /// Sum of line totals
    pub grand_total: Decimal,

    /// Sum of billable weights
    pub total_weight_kg: Decimal,
}

impl CatalogQuote {
    /// Presentation copy of the quote
    pub fn rounded(&self) -> Self {
        Self {
            currency_rate: self.currency_rate,
            lines: self
                .lines
                .iter()
                .map(|line| QuoteLine {
                    cost: line.cost.rounded(),
                    ..line.clone()
                })
                .collect(),
            total_goods: round_to(self.total_goods, MONEY_DP),
            total_freight: round_to(self.total_freight, MONEY_DP),
            grand_total: round_to(self.grand_total, MONEY_DP),
            total_weight_kg: round_to(self.total_weight_kg, WEIGHT_DP),
        }
    }
}

/// Price every product of the list.
///
/// Totals are summed at full precision so rounding error does not compound
/// across lines.
pub fn quote_catalog(price_list: &PriceList) -> CatalogQuote {
    let mut quote = CatalogQuote {
        currency_rate: price_list.currency_rate,
        ..Default::default()
    };

    for product in &price_list.products {
        let cost = compute_landed_cost(
            product,
            &price_list.delivery_options,
            price_list.currency_rate,
        );

        quote.total_goods += cost.goods_cost;
        quote.total_freight += cost.freight_cost;
        quote.grand_total += cost.total;
        quote.total_weight_kg += cost.billable_weight_kg;

        quote.lines.push(QuoteLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            delivery_option_name: find_delivery_option(product, &price_list.delivery_options)
                .map(|tier| tier.name.clone())
                .unwrap_or_default(),
            cost,
        });
    }

    quote
}

impl PriceList {
    /// Tier by exact name
    pub fn delivery_option(&self, name: &str) -> Option<&DeliveryOption> {
        self.delivery_options.iter().find(|o| o.name == name)
    }

    /// Delete a tier and clear every product reference to it
    pub fn remove_delivery_option(&mut self, name: &str) -> Option<DeliveryOption> {
        let index = self.delivery_options.iter().position(|o| o.name == name)?;
        let removed = self.delivery_options.remove(index);

        let mut cleared = 0usize;
        for product in &mut self.products {
            let by_name = product.delivery_option_name == removed.name;
            let by_id = removed.id.is_some() && product.delivery_option_id == removed.id;
            if by_name || by_id {
                product.delivery_option_name.clear();
                product.delivery_option_id = None;
                cleared += 1;
            }
        }

        tracing::debug!(tier = %removed.name, cleared, "Delivery option removed");
        Some(removed)
    }

    /// Rename a tier, carrying name references along.
    ///
    /// Returns how many product references were rewritten.
    pub fn rename_delivery_option(&mut self, old_name: &str, new_name: &str) -> Result<usize> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::Validation("delivery option name required".to_string()));
        }
        if old_name != new_name && self.delivery_option(new_name).is_some() {
            return Err(Error::Validation(format!(
                "delivery option {} already exists",
                new_name
            )));
        }

        let tier = self
            .delivery_options
            .iter_mut()
            .find(|o| o.name == old_name)
            .ok_or_else(|| Error::Validation(format!("delivery option {} not found", old_name)))?;
        tier.name = new_name.to_string();

        let mut rewritten = 0usize;
        for product in &mut self.products {
            if product.delivery_option_name == old_name {
                product.delivery_option_name = new_name.to_string();
                rewritten += 1;
            }
        }

        Ok(rewritten)
    }
}
