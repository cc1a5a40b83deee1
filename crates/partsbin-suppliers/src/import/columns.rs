use std::collections::BTreeMap;

use partsbin_scraper::normalize_key;
use serde::Serialize;

/// Rows scanned when looking for the header row.
pub const HEADER_SCAN_ROWS: usize = 20;

/// A header row must match at least this many mapped fields.
const MIN_HEADER_MATCHES: usize = 2;

/// Canonical column of an order file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportField {
    PartNumber,
    ManufacturerPartNumber,
    Manufacturer,
    Description,
    Quantity,
    UnitPrice,
    ExtendedPrice,
    CustomerReference,
    Package,
    Rohs,
}

impl ImportField {
    /// Columns every supplier export must provide.
    pub const ESSENTIAL: [ImportField; 4] = [
        ImportField::PartNumber,
        ImportField::ManufacturerPartNumber,
        ImportField::Description,
        ImportField::Quantity,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ImportField::PartNumber => "part_number",
            ImportField::ManufacturerPartNumber => "manufacturer_part_number",
            ImportField::Manufacturer => "manufacturer",
            ImportField::Description => "description",
            ImportField::Quantity => "quantity",
            ImportField::UnitPrice => "unit_price",
            ImportField::ExtendedPrice => "extended_price",
            ImportField::CustomerReference => "customer_reference",
            ImportField::Package => "package",
            ImportField::Rohs => "rohs",
        }
    }
}

impl std::fmt::Display for ImportField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical field to the header spellings a supplier uses for it.
///
/// The first alias is the spelling of the supplier's current export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    aliases: BTreeMap<ImportField, Vec<String>>,
}

impl ColumnMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, field: ImportField, aliases: &[&str]) -> Self {
        let entry = self.aliases.entry(field).or_default();
        entry.extend(aliases.iter().map(|a| (*a).to_owned()));
        self
    }

    #[must_use]
    pub fn aliases(&self, field: ImportField) -> &[String] {
        self.aliases.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Preferred header spelling for `field`.
    #[must_use]
    pub fn primary_header(&self, field: ImportField) -> Option<&str> {
        self.aliases(field).first().map(String::as_str)
    }

    #[must_use]
    pub fn covers(&self, field: ImportField) -> bool {
        !self.aliases(field).is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = ImportField> + '_ {
        self.aliases
            .iter()
            .filter(|(_, aliases)| !aliases.is_empty())
            .map(|(field, _)| *field)
    }

    #[must_use]
    pub fn missing_essentials(&self) -> Vec<ImportField> {
        ImportField::ESSENTIAL
            .into_iter()
            .filter(|f| !self.covers(*f))
            .collect()
    }
}

/// Location of the header row and of every recognized column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub row_index: usize,
    pub columns: BTreeMap<ImportField, usize>,
    /// Normalized header of every column, recognized or not.
    pub headers: Vec<String>,
}

/// Matches header cells to canonical fields through normalized aliases.
#[derive(Debug)]
pub struct ColumnMapper {
    lookup: Vec<(String, ImportField)>,
}

impl ColumnMapper {
    #[must_use]
    pub fn new(mapping: &ColumnMapping) -> Self {
        let lookup = mapping
            .fields()
            .flat_map(|field| {
                mapping
                    .aliases(field)
                    .iter()
                    .map(move |alias| (normalize_key(alias), field))
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { lookup }
    }

    #[must_use]
    pub fn match_header(&self, header: &str) -> Option<ImportField> {
        let key = normalize_key(header);
        self.lookup
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, field)| *field)
    }

    /// Picks the row among the first [`HEADER_SCAN_ROWS`] that recognizes the
    /// most fields; the earliest wins ties.
    #[must_use]
    pub fn locate_header(&self, rows: &[Vec<String>]) -> Option<HeaderMatch> {
        let mut best: Option<HeaderMatch> = None;
        for (row_index, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
            let mut columns = BTreeMap::new();
            for (col, cell) in row.iter().enumerate() {
                if let Some(field) = self.match_header(cell) {
                    columns.entry(field).or_insert(col);
                }
            }
            let better = best.as_ref().is_none_or(|b| columns.len() > b.columns.len());
            if columns.len() >= MIN_HEADER_MATCHES && better {
                best = Some(HeaderMatch {
                    row_index,
                    columns,
                    headers: row.iter().map(|h| normalize_key(h)).collect(),
                });
            }
        }
        best
    }
}
