use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One quantity break of a supplier's price list.
///
/// Construct through [`PricingBreak::new`]; it enforces `quantity >= 1`,
/// `price >= 0` and an upper-cased three-letter currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBreak {
    pub quantity: u64,
    pub price: f64,
    pub currency: String,
}

impl PricingBreak {
    /// Builds a break, coercing out-of-range values instead of rejecting them.
    ///
    /// - non-positive `quantity` becomes `1`
    /// - negative or non-finite `price` becomes `0.0`
    /// - `currency` is trimmed and upper-cased; anything that is not three
    ///   ASCII letters becomes `"USD"`
    #[must_use]
    pub fn new(quantity: i64, price: f64, currency: &str) -> Self {
        let quantity = u64::try_from(quantity).ok().filter(|q| *q >= 1).unwrap_or(1);
        let price = if price.is_finite() && price > 0.0 {
            price
        } else {
            0.0
        };
        Self {
            quantity,
            price,
            currency: normalize_currency(currency),
        }
    }
}

fn normalize_currency(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.len() == 3 && upper.chars().all(|c| c.is_ascii_alphabetic()) {
        upper
    } else {
        "USD".to_owned()
    }
}

/// The canonical enriched-part record every adapter produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartSearchResult {
    pub supplier_part_number: String,
    pub manufacturer: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub datasheet_url: Option<String>,
    pub image_url: Option<String>,
    /// Units in stock; never negative.
    pub stock_quantity: Option<u64>,
    /// Always sorted ascending by `quantity`; written only through
    /// [`PartSearchResult::set_pricing`].
    #[serde(default, deserialize_with = "sorted_pricing")]
    pricing: Option<Vec<PricingBreak>>,
    /// Specification values keyed by normalized name (`"resistance"`, `"package-case"`).
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    pub product_url: Option<String>,
    pub lifecycle_status: Option<String>,
    /// Supplier-specific extras with no canonical home.
    #[serde(default)]
    pub additional_data: serde_json::Map<String, Value>,
}

impl PartSearchResult {
    #[must_use]
    pub fn new(supplier_part_number: &str) -> Self {
        Self {
            supplier_part_number: supplier_part_number.trim().to_owned(),
            ..Self::default()
        }
    }

    /// Stores `breaks` sorted ascending by quantity; an empty list clears pricing.
    pub fn set_pricing(&mut self, mut breaks: Vec<PricingBreak>) {
        if breaks.is_empty() {
            self.pricing = None;
            return;
        }
        breaks.sort_by_key(|b| b.quantity);
        self.pricing = Some(breaks);
    }

    /// Price breaks, ascending by quantity.
    #[must_use]
    pub fn pricing(&self) -> Option<&[PricingBreak]> {
        self.pricing.as_deref()
    }

    #[must_use]
    pub fn into_pricing(self) -> Option<Vec<PricingBreak>> {
        self.pricing
    }

    /// Unit price for ordering `quantity` pieces: the highest break not above it.
    #[must_use]
    pub fn unit_price_for(&self, quantity: u64) -> Option<f64> {
        let breaks = self.pricing.as_deref()?;
        breaks
            .iter()
            .take_while(|b| b.quantity <= quantity)
            .last()
            .or_else(|| breaks.first())
            .map(|b| b.price)
    }

    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity.is_some_and(|q| q > 0)
    }
}

fn sorted_pricing<'de, D>(deserializer: D) -> Result<Option<Vec<PricingBreak>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let breaks = Option::<Vec<PricingBreak>>::deserialize(deserializer)?;
    let mut part = PartSearchResult::default();
    part.set_pricing(breaks.unwrap_or_default());
    Ok(part.pricing)
}
