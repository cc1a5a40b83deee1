use std::collections::BTreeMap;

use partsbin_core::ImportedPart;
use partsbin_scraper::{clean_text, parse_number};
use serde_json::{Map, Value};

use super::columns::{HeaderMatch, ImportField};

/// One data row after trimming and validation, before it becomes an
/// [`ImportedPart`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRow {
    /// 1-based row number in the source file.
    pub row_number: usize,
    /// Non-empty, cleaned values of the recognized columns.
    pub values: BTreeMap<ImportField, String>,
    /// Non-empty values of unrecognized columns, keyed by normalized header.
    pub extras: BTreeMap<String, String>,
    pub quantity: u64,
    pub unit_price: Option<f64>,
    pub extended_price: Option<f64>,
}

impl MappedRow {
    #[must_use]
    pub fn get(&self, field: ImportField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    /// The supplier part number, falling back to the manufacturer part number.
    #[must_use]
    pub fn supplier_part_number(&self) -> &str {
        self.get(ImportField::PartNumber)
            .or_else(|| self.get(ImportField::ManufacturerPartNumber))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn into_part(self, supplier: &str, additional_properties: Map<String, Value>) -> ImportedPart {
        ImportedPart {
            supplier_part_number: self.supplier_part_number().to_owned(),
            manufacturer: self.get(ImportField::Manufacturer).map(str::to_owned),
            manufacturer_part_number: self
                .get(ImportField::ManufacturerPartNumber)
                .map(str::to_owned),
            description: self.get(ImportField::Description).unwrap_or_default().to_owned(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            extended_price: self.extended_price,
            supplier: supplier.to_owned(),
            additional_properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Mapped(MappedRow),
    /// Every cell empty; ignored silently.
    Blank,
    /// Row rejected; carries the warning to report.
    Skipped(String),
}

/// Turns raw data rows into [`MappedRow`]s using a located header.
#[derive(Debug)]
pub struct DataMapper<'a> {
    header: &'a HeaderMatch,
}

impl<'a> DataMapper<'a> {
    #[must_use]
    pub fn new(header: &'a HeaderMatch) -> Self {
        Self { header }
    }

    #[must_use]
    pub fn map_row(&self, row_number: usize, cells: &[String]) -> RowOutcome {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return RowOutcome::Blank;
        }

        let mut row = MappedRow {
            row_number,
            ..MappedRow::default()
        };
        for (col, raw) in cells.iter().enumerate() {
            let value = clean_text(raw);
            if value.is_empty() {
                continue;
            }
            match self.header.columns.iter().find(|(_, c)| **c == col) {
                Some((field, _)) => {
                    row.values.insert(*field, value);
                }
                None => {
                    if let Some(key) = self.header.headers.get(col).filter(|k| !k.is_empty()) {
                        row.extras.insert(key.clone(), value);
                    }
                }
            }
        }

        if row.get(ImportField::Description).is_none() {
            return RowOutcome::Skipped(format!("row {row_number}: empty description, skipped"));
        }
        if row.supplier_part_number().is_empty() {
            return RowOutcome::Skipped(format!("row {row_number}: missing part number, skipped"));
        }
        let raw_quantity = row.get(ImportField::Quantity).unwrap_or_default();
        let Some(quantity) = parse_quantity(raw_quantity) else {
            return RowOutcome::Skipped(format!(
                "row {row_number}: invalid quantity '{raw_quantity}', skipped"
            ));
        };
        row.quantity = quantity;
        row.unit_price = row.get(ImportField::UnitPrice).and_then(parse_price);
        row.extended_price = row
            .get(ImportField::ExtendedPrice)
            .and_then(parse_price)
            .or_else(|| row.unit_price.map(|unit| round_price(unit * quantity_f64(quantity))));

        RowOutcome::Mapped(row)
    }
}

/// Positive whole quantity; thousands separators allowed, `"12.0"` accepted.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    if let Ok(q) = cleaned.parse::<u64>() {
        return (q > 0).then_some(q);
    }
    let f = cleaned.parse::<f64>().ok()?;
    if !f.is_finite() || f < 1.0 || f.fract() != 0.0 || f > 9.0e15 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let quantity = f as u64;
    Some(quantity)
}

fn parse_price(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|p| p.is_finite() && *p >= 0.0)
}

#[allow(clippy::cast_precision_loss)]
fn quantity_f64(quantity: u64) -> f64 {
    quantity as f64
}

fn round_price(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
