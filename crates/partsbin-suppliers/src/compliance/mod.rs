//! Cross-supplier consistency checks for order-import adapters.
//!
//! Each adapter is driven through synthetic order files built from its own
//! [`ColumnMapping`], without network access, and scored on how the shared
//! import contract holds up: column coverage, golden-row mapping, failure
//! reporting, tolerance of messy rows and the additional-properties layout.

mod report;

use std::panic::{catch_unwind, AssertUnwindSafe};

use partsbin_core::{FileType, ImportResult, SupplierCapability};

use crate::contract::{OrderImport, SupplierAdapter};
use crate::import::{ColumnMapping, ImportField};
use crate::registry::SupplierRegistry;

pub use self::report::{AdapterReport, Check, CheckResult, CommonIssue, FrameworkReport, Grade};

const FIXTURE_FILENAME: &str = "compliance_fixture.csv";

/// Values of the golden row, one per canonical column.
fn golden_value(field: ImportField) -> &'static str {
    match field {
        ImportField::PartNumber => "GOLD-001",
        ImportField::ManufacturerPartNumber => "GM-10K-0603",
        ImportField::Manufacturer => "Golden Components",
        ImportField::Description => "Thick film resistor 10k 1% 0603",
        ImportField::Quantity => "25",
        ImportField::UnitPrice => "0.40",
        ImportField::ExtendedPrice => "10.00",
        ImportField::CustomerReference => "R7",
        ImportField::Package => "0603",
        ImportField::Rohs => "YES",
    }
}

/// Validates one adapter; `None` when it does not import orders.
#[must_use]
pub fn validate_adapter(adapter: &dyn SupplierAdapter) -> Option<AdapterReport> {
    if !adapter.capabilities().contains(&SupplierCapability::ImportOrders) {
        return None;
    }
    let importer = adapter.order_import()?;
    let info = adapter.info();
    let report = validate_importer(&info.name, importer);
    tracing::info!(
        supplier = %info.name,
        score = report.overall_score,
        grade = ?report.grade,
        "compliance validated"
    );
    Some(report)
}

/// Runs every [`Check`] against `importer`.
#[must_use]
pub fn validate_importer(supplier: &str, importer: &dyn OrderImport) -> AdapterReport {
    let fixtures = Fixtures::new(&importer.column_mapping());
    let checks = vec![
        check_column_mapping(&fixtures.mapping),
        check_data_mapping(importer, &fixtures),
        check_error_handling(importer, &fixtures),
        check_defensive_parsing(importer, &fixtures),
        check_additional_properties(importer, &fixtures),
    ];
    AdapterReport::new(supplier, &importer.supplier_display_name(), checks)
}

/// Validates every registered adapter and aggregates the results.
#[must_use]
pub fn validate_registry(registry: &SupplierRegistry) -> FrameworkReport {
    let mut reports = Vec::new();
    let mut skipped = Vec::new();
    for name in registry.list_names() {
        let adapter = match registry.get(&name) {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::warn!(supplier = %name, error = %e, "could not instantiate adapter for validation");
                skipped.push(name);
                continue;
            }
        };
        match validate_adapter(adapter.as_ref()) {
            Some(report) => reports.push(report),
            None => {
                tracing::debug!(supplier = %name, "no order import, skipped");
                skipped.push(name);
            }
        }
    }
    FrameworkReport::new(reports, skipped)
}

/// Synthetic order files derived from an adapter's column mapping.
struct Fixtures {
    mapping: ColumnMapping,
    fields: Vec<ImportField>,
}

impl Fixtures {
    fn new(mapping: &ColumnMapping) -> Self {
        Self {
            fields: mapping.fields().collect(),
            mapping: mapping.clone(),
        }
    }

    fn header(&self, fields: &[ImportField]) -> Vec<String> {
        fields
            .iter()
            .filter_map(|f| self.mapping.primary_header(*f))
            .map(str::to_owned)
            .collect()
    }

    /// Golden row with `overrides` applied, limited to `fields`.
    fn row(&self, fields: &[ImportField], overrides: &[(ImportField, &str)]) -> Vec<String> {
        fields
            .iter()
            .filter(|f| self.mapping.covers(**f))
            .map(|f| {
                overrides
                    .iter()
                    .find(|(field, _)| field == f)
                    .map_or(golden_value(*f), |(_, value)| *value)
                    .to_owned()
            })
            .collect()
    }

    fn csv(&self, fields: &[ImportField], rows: &[Vec<String>]) -> Vec<u8> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let records = std::iter::once(self.header(fields)).chain(rows.iter().cloned());
        for record in records {
            if writer.write_record(&record).is_err() {
                return Vec::new();
            }
        }
        writer.into_inner().unwrap_or_default()
    }

    fn golden(&self) -> Vec<u8> {
        self.csv(&self.fields, &[self.row(&self.fields, &[])])
    }

    fn with_rows(&self, rows: &[Vec<String>]) -> Vec<u8> {
        self.csv(&self.fields, rows)
    }
}

/// Imports `content`, turning a panic into a failed result.
fn run_import(importer: &dyn OrderImport, content: &[u8]) -> Result<ImportResult, String> {
    catch_unwind(AssertUnwindSafe(|| {
        importer.import_order_file(content, FileType::Csv, FIXTURE_FILENAME)
    }))
    .map_err(|panic| {
        panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned())
    })
}

/// Collects named sub-assertions into a score and issue list.
struct Tally {
    check: Check,
    passed: usize,
    total: usize,
    issues: Vec<String>,
}

impl Tally {
    fn new(check: Check) -> Self {
        Self {
            check,
            passed: 0,
            total: 0,
            issues: Vec::new(),
        }
    }

    fn assert(&mut self, holds: bool, issue: impl FnOnce() -> String) {
        self.total += 1;
        if holds {
            self.passed += 1;
        } else {
            self.issues.push(issue());
        }
    }

    fn finish(self) -> CheckResult {
        CheckResult::from_counts(self.check, self.passed, self.total, self.issues)
    }
}

fn check_column_mapping(mapping: &ColumnMapping) -> CheckResult {
    let mut tally = Tally::new(Check::ColumnMapping);
    for field in ImportField::ESSENTIAL {
        tally.assert(mapping.covers(field), || format!("no column mapped for {field}"));
    }
    tally.finish()
}

fn close(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|v| (v - expected).abs() < 1e-6)
}

fn check_data_mapping(importer: &dyn OrderImport, fixtures: &Fixtures) -> CheckResult {
    let mut tally = Tally::new(Check::DataMapping);
    let result = match run_import(importer, &fixtures.golden()) {
        Ok(result) => result,
        Err(panic) => {
            tally.assert(false, || format!("golden import panicked: {panic}"));
            return tally.finish();
        }
    };
    let [part] = result.parts.as_slice() else {
        tally.assert(false, || {
            format!(
                "golden file produced {} parts (error: {})",
                result.parts.len(),
                result.error_message.as_deref().unwrap_or("none")
            )
        });
        return tally.finish();
    };

    tally.assert(result.success, || "golden import reported failure".to_owned());
    tally.assert(part.supplier == importer.supplier_display_name(), || {
        format!("supplier is '{}', expected the display name", part.supplier)
    });
    tally.assert(part.description == golden_value(ImportField::Description), || {
        format!("description mapped to '{}'", part.description)
    });
    tally.assert(part.quantity == 25, || format!("quantity mapped to {}", part.quantity));

    let mapping = &fixtures.mapping;
    if mapping.covers(ImportField::PartNumber) {
        tally.assert(part.supplier_part_number == golden_value(ImportField::PartNumber), || {
            format!("supplier part number mapped to '{}'", part.supplier_part_number)
        });
    }
    if mapping.covers(ImportField::ManufacturerPartNumber) {
        tally.assert(
            part.manufacturer_part_number.as_deref() == Some(golden_value(ImportField::ManufacturerPartNumber)),
            || format!("manufacturer part number mapped to {:?}", part.manufacturer_part_number),
        );
    }
    if mapping.covers(ImportField::Manufacturer) {
        tally.assert(
            part.manufacturer.as_deref() == Some(golden_value(ImportField::Manufacturer)),
            || format!("manufacturer mapped to {:?}", part.manufacturer),
        );
    }
    if mapping.covers(ImportField::UnitPrice) {
        tally.assert(close(part.unit_price, 0.40), || {
            format!("unit price mapped to {:?}", part.unit_price)
        });
    }
    // Computed from quantity and unit price when the column is absent.
    if mapping.covers(ImportField::ExtendedPrice) || mapping.covers(ImportField::UnitPrice) {
        tally.assert(close(part.extended_price, 10.0), || {
            format!("extended price mapped to {:?}", part.extended_price)
        });
    }
    tally.finish()
}

fn check_error_handling(importer: &dyn OrderImport, fixtures: &Fixtures) -> CheckResult {
    let mut tally = Tally::new(Check::ErrorHandling);
    let header_only = fixtures.with_rows(&[]);
    let inputs: [(&str, &[u8]); 3] = [
        ("empty file", b""),
        ("garbage", b"\x00\x01\x02\xff not an order export \xfe\n;;;\n"),
        ("header-only file", &header_only),
    ];

    for (label, content) in inputs {
        match run_import(importer, content) {
            Ok(result) => tally.assert(
                !result.success
                    && result.parts.is_empty()
                    && result.error_message.as_deref().is_some_and(|m| !m.trim().is_empty()),
                || {
                    format!(
                        "{label}: expected a failed result with an error message, got success={} parts={}",
                        result.success,
                        result.parts.len()
                    )
                },
            ),
            Err(panic) => tally.assert(false, || format!("{label}: import panicked: {panic}")),
        }
    }
    tally.finish()
}

fn check_defensive_parsing(importer: &dyn OrderImport, fixtures: &Fixtures) -> CheckResult {
    let mut tally = Tally::new(Check::DefensiveParsing);
    let fields = &fixtures.fields;

    let padded_part = format!("  {}  ", golden_value(ImportField::PartNumber));
    let padded_description = format!("\t{} ", golden_value(ImportField::Description));
    let padded = fixtures.with_rows(&[fixtures.row(
        fields,
        &[
            (ImportField::PartNumber, padded_part.as_str()),
            (ImportField::Description, padded_description.as_str()),
        ],
    )]);
    match run_import(importer, &padded) {
        Ok(result) => tally.assert(
            result.parts.first().is_some_and(|p| {
                p.description == golden_value(ImportField::Description)
                    && !p.supplier_part_number.starts_with(' ')
                    && !p.supplier_part_number.ends_with(' ')
            }),
            || "padded values are not trimmed".to_owned(),
        ),
        Err(panic) => tally.assert(false, || format!("padded row panicked: {panic}")),
    }

    for (label, field, value) in [
        ("empty description", ImportField::Description, ""),
        ("malformed quantity", ImportField::Quantity, "lots"),
    ] {
        let content = fixtures.with_rows(&[fixtures.row(fields, &[]), fixtures.row(fields, &[(field, value)])]);
        match run_import(importer, &content) {
            Ok(result) => tally.assert(
                result.success && result.parts.len() == 1 && !result.warnings.is_empty(),
                || {
                    format!(
                        "{label} row: expected it skipped with a warning, got {} parts and {} warnings",
                        result.parts.len(),
                        result.warnings.len()
                    )
                },
            ),
            Err(panic) => tally.assert(false, || format!("{label} row panicked: {panic}")),
        }
    }

    let essentials: Vec<ImportField> = ImportField::ESSENTIAL
        .into_iter()
        .filter(|f| fixtures.mapping.covers(*f))
        .collect();
    let minimal = fixtures.csv(&essentials, &[fixtures.row(&essentials, &[])]);
    match run_import(importer, &minimal) {
        Ok(result) => tally.assert(result.success && result.parts.len() == 1, || {
            format!(
                "file without optional columns rejected: {}",
                result.error_message.as_deref().unwrap_or("no parts")
            )
        }),
        Err(panic) => tally.assert(false, || format!("file without optional columns panicked: {panic}")),
    }

    tally.finish()
}

fn check_additional_properties(importer: &dyn OrderImport, fixtures: &Fixtures) -> CheckResult {
    let mut tally = Tally::new(Check::AdditionalProperties);
    let properties = run_import(importer, &fixtures.golden())
        .ok()
        .and_then(|result| result.parts.into_iter().next())
        .map(|part| part.additional_properties)
        .unwrap_or_default();
    let is_section = |key: &str| properties.get(key).is_some_and(serde_json::Value::is_object);

    tally.assert(is_section("supplier_data"), || "missing supplier_data section".to_owned());
    tally.assert(is_section("order_info"), || "missing order_info section".to_owned());
    tally.assert(
        ["technical_specs", "technical", "compliance"].iter().any(|k| is_section(k)),
        || "missing technical_specs or compliance section".to_owned(),
    );
    tally.finish()
}

#[cfg(test)]
#[path = "compliance_test.rs"]
mod tests;
