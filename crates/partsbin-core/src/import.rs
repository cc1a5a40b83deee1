//! Canonical records produced by the order-file import pipeline.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CoreError;

/// Declared type of an uploaded order file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Xls,
    Xlsx,
}

impl FileType {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            FileType::Csv => ".csv",
            FileType::Xls => ".xls",
            FileType::Xlsx => ".xlsx",
        }
    }

    /// Infers the type from a filename's extension (case-insensitive).
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl FromStr for FileType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(FileType::Csv),
            "xls" => Ok(FileType::Xls),
            "xlsx" => Ok(FileType::Xlsx),
            _ => Err(CoreError::UnknownFileType(s.to_owned())),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension().trim_start_matches('.'))
    }
}

/// One canonical line item parsed from an order file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedPart {
    pub supplier_part_number: String,
    pub manufacturer: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub description: String,
    pub quantity: u64,
    pub unit_price: Option<f64>,
    pub extended_price: Option<f64>,
    /// Supplier display name.
    pub supplier: String,
    #[serde(default)]
    pub additional_properties: serde_json::Map<String, Value>,
}

/// Order-level metadata recovered from the file name or contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_number: Option<String>,
    pub order_date: Option<NaiveDate>,
}

impl OrderInfo {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order_number.is_none() && self.order_date.is_none()
    }
}

/// Outcome of parsing one order file.
///
/// A failed import never carries parts: `success == false` implies
/// `parts.is_empty()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub parts: Vec<ImportedPart>,
    pub parts_count: usize,
    pub skipped_rows: usize,
    pub error_message: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub order_info: Option<OrderInfo>,
}

impl ImportResult {
    #[must_use]
    pub fn succeeded(parts: Vec<ImportedPart>, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            parts_count: parts.len(),
            parts,
            warnings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            warnings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_order_info(mut self, info: OrderInfo) -> Self {
        self.order_info = (!info.is_empty()).then_some(info);
        self
    }

    #[must_use]
    pub fn with_skipped_rows(mut self, skipped: usize) -> Self {
        self.skipped_rows = skipped;
        self
    }
}
