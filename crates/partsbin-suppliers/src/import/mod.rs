//! Shared order-file import pipeline.
//!
//! `read_table` turns bytes into rows, [`ColumnMapper`] finds the header row
//! and [`DataMapper`] validates each data row. Adapters only provide a
//! [`ColumnMapping`] and, optionally, extra properties per row.

mod columns;
mod mapper;
mod reader;

use partsbin_core::{FileType, ImportResult, OrderInfo};
use serde_json::{json, Map, Value};

use crate::contract::OrderImport;
use crate::error::ImportError;

pub use self::columns::{ColumnMapper, ColumnMapping, HeaderMatch, ImportField, HEADER_SCAN_ROWS};
pub use self::mapper::{parse_quantity, DataMapper, MappedRow, RowOutcome};
pub use self::reader::read_table;

/// Runs the full pipeline for `adapter`. Never fails; see [`ImportResult`].
pub fn import_order<A: OrderImport + ?Sized>(
    adapter: &A,
    content: &[u8],
    file_type: FileType,
    filename: &str,
) -> ImportResult {
    let supplier = adapter.supplier_display_name();
    let rows = match read_table(content, file_type) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(supplier = %supplier, filename, error = %e, "order file unreadable");
            return ImportResult::failed(format!("could not read {file_type} file: {e}"), Vec::new());
        }
    };

    let mapping = adapter.column_mapping();
    let header = match locate_columns(&mapping, &rows) {
        Ok(header) => header,
        Err(e) => {
            tracing::warn!(supplier = %supplier, filename, error = %e, "order file has no usable header");
            return ImportResult::failed(e.to_string(), Vec::new());
        }
    };

    let order = adapter.extract_order_info(filename);
    let mapper = DataMapper::new(&header);
    let mut parts = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped = 0usize;

    for (index, cells) in rows.iter().enumerate().skip(header.row_index + 1) {
        match mapper.map_row(index + 1, cells) {
            RowOutcome::Mapped(row) => {
                let extras = adapter.build_additional_properties(&row, &order);
                parts.push(row.into_part(&supplier, extras));
            }
            RowOutcome::Skipped(warning) => {
                tracing::debug!(supplier = %supplier, filename, warning = %warning, "row skipped");
                skipped += 1;
                warnings.push(warning);
            }
            RowOutcome::Blank => {}
        }
    }

    if parts.is_empty() {
        tracing::warn!(supplier = %supplier, filename, skipped, "no valid parts in order file");
        return ImportResult::failed(format!("no valid parts found in {filename}"), warnings)
            .with_skipped_rows(skipped);
    }

    tracing::info!(supplier = %supplier, filename, parts = parts.len(), skipped, "order file imported");
    ImportResult::succeeded(parts, warnings)
        .with_skipped_rows(skipped)
        .with_order_info(order)
}

fn locate_columns(mapping: &ColumnMapping, rows: &[Vec<String>]) -> Result<HeaderMatch, ImportError> {
    let header = ColumnMapper::new(mapping)
        .locate_header(rows)
        .ok_or(ImportError::HeaderNotFound {
            scanned: rows.len().min(HEADER_SCAN_ROWS),
        })?;

    for required in [ImportField::Description, ImportField::Quantity] {
        if !header.columns.contains_key(&required) {
            return Err(ImportError::MissingColumn(required.to_string()));
        }
    }
    if !header.columns.contains_key(&ImportField::PartNumber)
        && !header.columns.contains_key(&ImportField::ManufacturerPartNumber)
    {
        return Err(ImportError::MissingColumn(ImportField::PartNumber.to_string()));
    }
    Ok(header)
}

/// `true` when `content` parses and carries a header row for `mapping`
/// that includes the supplier's own part-number column, which is what
/// tells one supplier's export from another's.
#[must_use]
pub fn detect_columns(content: &[u8], file_type: FileType, mapping: &ColumnMapping) -> bool {
    read_table(content, file_type).ok().is_some_and(|rows| {
        locate_columns(mapping, &rows)
            .is_ok_and(|header| header.columns.contains_key(&ImportField::PartNumber))
    })
}

/// The property layout every adapter starts from: `supplier_data`,
/// `order_info` and `technical_specs`, plus `compliance` when a RoHS
/// column is present.
#[must_use]
pub fn standard_additional_properties(
    supplier: &str,
    row: &MappedRow,
    order: &OrderInfo,
) -> Map<String, Value> {
    let mut supplier_data = Map::new();
    supplier_data.insert("supplier".to_owned(), json!(supplier));
    supplier_data.insert("supplier_part_number".to_owned(), json!(row.supplier_part_number()));
    if let Some(reference) = row.get(ImportField::CustomerReference) {
        supplier_data.insert("customer_reference".to_owned(), json!(reference));
    }
    for (key, value) in &row.extras {
        supplier_data.insert(key.clone(), json!(value));
    }

    let mut order_info = Map::new();
    order_info.insert("source_row".to_owned(), json!(row.row_number));
    order_info.insert("quantity".to_owned(), json!(row.quantity));
    if let Some(number) = &order.order_number {
        order_info.insert("order_number".to_owned(), json!(number));
    }
    if let Some(date) = order.order_date {
        order_info.insert("order_date".to_owned(), json!(date.to_string()));
    }
    if let Some(unit) = row.unit_price {
        order_info.insert("unit_price".to_owned(), json!(unit));
    }
    if let Some(extended) = row.extended_price {
        order_info.insert("extended_price".to_owned(), json!(extended));
    }

    let mut technical = Map::new();
    if let Some(mpn) = row.get(ImportField::ManufacturerPartNumber) {
        technical.insert("manufacturer_part_number".to_owned(), json!(mpn));
    }
    if let Some(package) = row.get(ImportField::Package) {
        technical.insert("package".to_owned(), json!(package));
    }

    let mut properties = Map::new();
    properties.insert("supplier_data".to_owned(), Value::Object(supplier_data));
    properties.insert("order_info".to_owned(), Value::Object(order_info));
    properties.insert("technical_specs".to_owned(), Value::Object(technical));
    if let Some(rohs) = row.get(ImportField::Rohs) {
        properties.insert(
            "compliance".to_owned(),
            json!({ "rohs": rohs, "rohs_compliant": is_rohs_compliant(rohs) }),
        );
    }
    properties
}

fn is_rohs_compliant(raw: &str) -> bool {
    let lower = raw.trim().to_ascii_lowercase();
    let negated = lower.contains("non") || lower.contains("not");
    !negated && (lower.contains("yes") || lower.contains("compliant") || lower == "y")
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
