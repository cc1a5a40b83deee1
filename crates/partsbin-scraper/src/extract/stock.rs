use std::sync::LazyLock;

use partsbin_core::ExtractionResult;
use regex::Regex;
use serde_json::Value;

use super::{Coerce, DataExtractor};

static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(-?\d[\d,]*)").expect("valid stock regex"));

const DISCONTINUED_KEYWORDS: [&str; 4] = ["discontinued", "obsolete", "not available", "out of stock"];

fn signals_no_stock(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DISCONTINUED_KEYWORDS.iter().any(|k| lowered.contains(k))
}

impl DataExtractor {
    /// Extracts a non-negative stock count.
    ///
    /// Availability paths are checked first: any discontinuation keyword there
    /// short-circuits to `0`. Otherwise the first parseable stock path wins.
    /// Strings like `"1000+"` yield their leading integer plus a warning that
    /// the figure is a minimum; negative counts are clamped to `0`.
    #[must_use]
    pub fn extract_stock_quantity(
        &self,
        data: &Value,
        stock_paths: &[&str],
        availability_paths: &[&str],
    ) -> ExtractionResult<u64> {
        for path in availability_paths {
            if let Some(text) = self.safe_get(data, path).and_then(String::coerce) {
                if signals_no_stock(&text) {
                    tracing::debug!(supplier = %self.supplier, path, availability = %text, "part not available");
                    return ExtractionResult::ok(0);
                }
            }
        }

        let mut warnings = Vec::new();
        for path in stock_paths {
            let Some(value) = self.safe_get(data, path) else {
                warnings.push(format!("stock path '{path}': no data"));
                continue;
            };

            let parsed = match value {
                Value::Number(_) => i64::coerce(value),
                Value::String(s) if signals_no_stock(s) => Some(0),
                Value::String(s) => parse_stock_string(s, path, &mut warnings),
                _ => None,
            };

            let Some(quantity) = parsed else {
                warnings.push(format!("stock path '{path}': unparseable value {value}"));
                continue;
            };

            if quantity < 0 {
                warnings.push(format!("stock path '{path}': negative stock {quantity} clamped to 0"));
            }
            let quantity = u64::try_from(quantity).unwrap_or(0);
            return ExtractionResult::ok(quantity).with_warnings(warnings);
        }

        ExtractionResult::failed("no stock information found").with_warnings(warnings)
    }
}

fn parse_stock_string(raw: &str, path: &str, warnings: &mut Vec<String>) -> Option<i64> {
    let trimmed = raw.trim();
    let caps = LEADING_INT_RE.captures(trimmed)?;
    let digits = caps[1].replace(',', "");
    let quantity = digits.parse::<i64>().ok()?;
    if caps[0].len() < trimmed.len() {
        warnings.push(format!(
            "stock path '{path}': '{trimmed}' is a minimum, actual stock may be higher"
        ));
    }
    Some(quantity)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ex() -> DataExtractor {
        DataExtractor::new("test")
    }

    #[test]
    fn plus_suffix_yields_leading_integer_with_warning() {
        let data = json!({"stock": "1000+"});
        let result = ex().extract_stock_quantity(&data, &["stock"], &[]);
        assert_eq!(result.value(), Some(&1000));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("minimum"));
    }

    #[test]
    fn thousands_separators_are_accepted() {
        let data = json!({"stock": "12,500"});
        let result = ex().extract_stock_quantity(&data, &["stock"], &[]);
        assert_eq!(result.value(), Some(&12_500));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn obsolete_availability_short_circuits_to_zero() {
        let data = json!({"stock": 5000, "status": "Obsolete"});
        let result = ex().extract_stock_quantity(&data, &["stock"], &["status"]);
        assert_eq!(result.value(), Some(&0));
    }

    #[test]
    fn negative_stock_is_clamped() {
        let data = json!({"stock": -12});
        let result = ex().extract_stock_quantity(&data, &["stock"], &[]);
        assert_eq!(result.value(), Some(&0));
        assert!(result.warnings[0].contains("clamped"));
    }

    #[test]
    fn out_of_stock_text_in_stock_field_is_zero() {
        let data = json!({"stock": "Out of Stock"});
        let result = ex().extract_stock_quantity(&data, &["stock"], &[]);
        assert_eq!(result.value(), Some(&0));
    }

    #[test]
    fn unparseable_falls_through_then_fails() {
        let data = json!({"a": "call us", "b": {"nested": true}});
        let result = ex().extract_stock_quantity(&data, &["a", "b", "c"], &[]);
        assert!(!result.success);
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn in_stock_availability_does_not_short_circuit() {
        let data = json!({"AvailabilityInStock": "2,411", "Availability": "2411 In Stock"});
        let result = ex().extract_stock_quantity(&data, &["AvailabilityInStock"], &["Availability"]);
        assert_eq!(result.value(), Some(&2411));
    }
}
