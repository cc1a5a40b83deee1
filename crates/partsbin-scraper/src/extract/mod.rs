//! Defensive extraction of canonical fields from heterogeneous JSON payloads.
//!
//! Every operation tries a list of candidate paths in order and returns an
//! [`ExtractionResult`] rather than an error, so a malformed supplier response
//! degrades to partial data plus warnings.

mod fields;
mod pricing;
mod stock;
mod urls;

use serde_json::Value;

pub use fields::PartNumbers;
pub use pricing::PricingKeys;
pub use urls::{DATASHEET_EXTENSIONS, IMAGE_EXTENSIONS};

/// Stateless extractor; the supplier name only tags log events.
#[derive(Debug, Clone)]
pub struct DataExtractor {
    supplier: String,
}

impl DataExtractor {
    #[must_use]
    pub fn new(supplier: &str) -> Self {
        Self {
            supplier: supplier.to_owned(),
        }
    }

    #[must_use]
    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    /// Walks a dotted path (`"result.productPriceList.0.ladder"`) through
    /// objects and arrays. Numeric segments index arrays.
    ///
    /// Returns `None` on any missing or null step, including a null leaf.
    #[must_use]
    pub fn safe_get<'a>(&self, data: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = data;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
            if current.is_null() {
                return None;
            }
        }
        (!current.is_null()).then_some(current)
    }

    /// [`Self::safe_get`] followed by [`safe_cast`], falling back to `default`.
    #[must_use]
    pub fn get_or<T: Coerce>(&self, data: &Value, path: &str, default: T) -> T {
        let Some(value) = self.safe_get(data, path) else {
            return default;
        };
        T::coerce(value).unwrap_or_else(|| {
            tracing::debug!(supplier = %self.supplier, path, %value, "value did not coerce, using default");
            default
        })
    }

    /// First candidate path whose value coerces to `T`.
    #[must_use]
    pub fn first_of<T: Coerce>(&self, data: &Value, paths: &[&str]) -> Option<T> {
        paths
            .iter()
            .filter_map(|path| self.safe_get(data, path))
            .find_map(T::coerce)
    }
}

/// Conversion from a loosely typed JSON value.
///
/// Strings are parsed the way suppliers tend to format them: numbers may carry
/// currency symbols or thousands separators, booleans may be `yes`/`on`/`1`.
pub trait Coerce: Sized {
    fn coerce(value: &Value) -> Option<Self>;
}

/// Coerces `value` to `T`, returning `default` when it cannot.
#[must_use]
pub fn safe_cast<T: Coerce>(value: &Value, default: T) -> T {
    T::coerce(value).unwrap_or(default)
}

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => partsbin_core::fields::parse_bool_literal(s),
            _ => None,
        }
    }
}

impl Coerce for f64 {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        }
        .filter(|f| f.is_finite())
    }
}

impl Coerce for i64 {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
            Value::String(s) => parse_number(s).and_then(float_to_i64),
            _ => None,
        }
    }
}

impl Coerce for u64 {
    fn coerce(value: &Value) -> Option<Self> {
        i64::coerce(value).and_then(|n| u64::try_from(n).ok())
    }
}

impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_i64(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < 9.0e18).then(|| f.trunc() as i64)
}

/// Parses a human-formatted number: `"$1,234.50"`, `" 0.0123 USD"`, `"-5"`.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
