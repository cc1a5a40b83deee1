use partsbin_core::{ExtractionResult, PricingBreak};
use serde_json::Value;

use super::{Coerce, DataExtractor};

/// Field names tried, in order, inside each price-break entry.
#[derive(Debug, Clone, Copy)]
pub struct PricingKeys<'a> {
    pub quantity: &'a [&'a str],
    pub price: &'a [&'a str],
    pub currency: &'a [&'a str],
    /// Used when an entry carries no currency field.
    pub default_currency: &'a str,
}

impl Default for PricingKeys<'static> {
    fn default() -> Self {
        Self {
            quantity: &["quantity", "Quantity", "qty", "breakQuantity", "BreakQuantity"],
            price: &["price", "Price", "unitPrice", "UnitPrice", "unit_price"],
            currency: &["currency", "Currency"],
            default_currency: "USD",
        }
    }
}

impl DataExtractor {
    /// Extracts a price-break list from the first candidate path holding a non-empty list.
    ///
    /// Paths are never merged. Each entry is parsed defensively: a missing or
    /// unparseable quantity becomes `1`, a missing price `0.0`. The result is
    /// sorted ascending by quantity.
    #[must_use]
    pub fn extract_pricing(
        &self,
        data: &Value,
        candidate_paths: &[&str],
        keys: &PricingKeys<'_>,
    ) -> ExtractionResult<Vec<PricingBreak>> {
        let mut warnings = Vec::new();

        for path in candidate_paths {
            let entries = match self.safe_get(data, path) {
                Some(Value::Array(entries)) if !entries.is_empty() => entries,
                Some(Value::Array(_)) => {
                    warnings.push(format!("pricing path '{path}': empty list"));
                    continue;
                }
                Some(other) => {
                    warnings.push(format!("pricing path '{path}': expected a list, found {}", json_kind(other)));
                    continue;
                }
                None => {
                    warnings.push(format!("pricing path '{path}': no data"));
                    continue;
                }
            };

            let mut breaks = Vec::with_capacity(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                if !entry.is_object() {
                    warnings.push(format!("pricing path '{path}': entry {index} is not an object"));
                    continue;
                }
                breaks.push(self.parse_break(entry, keys, &mut warnings, path, index));
            }

            if breaks.is_empty() {
                continue;
            }

            breaks.sort_by_key(|b| b.quantity);
            tracing::debug!(supplier = %self.supplier, path, breaks = breaks.len(), "extracted pricing");
            return ExtractionResult::ok(breaks).with_warnings(warnings);
        }

        tracing::debug!(supplier = %self.supplier, "no pricing data found");
        ExtractionResult::failed("no pricing data found").with_warnings(warnings)
    }

    fn parse_break(
        &self,
        entry: &Value,
        keys: &PricingKeys<'_>,
        warnings: &mut Vec<String>,
        path: &str,
        index: usize,
    ) -> PricingBreak {
        let quantity = self.first_of::<i64>(entry, keys.quantity).unwrap_or_else(|| {
            warnings.push(format!("pricing path '{path}': entry {index} has no quantity, using 1"));
            1
        });
        let price = self.first_of::<f64>(entry, keys.price).unwrap_or_else(|| {
            warnings.push(format!("pricing path '{path}': entry {index} has no price, using 0.0"));
            0.0
        });
        let currency = keys
            .currency
            .iter()
            .filter_map(|k| self.safe_get(entry, k))
            .find_map(String::coerce)
            .unwrap_or_else(|| keys.default_currency.to_owned());
        PricingBreak::new(quantity, price, &currency)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
