//! The supplier adapter contract.
//!
//! An adapter is a [`SupplierAdapter`] plus up to three facets, one per group
//! of capabilities. Every [`SupplierCapability`] belongs to exactly one facet
//! (see [`facet_for`]); the registry refuses adapters that declare a
//! capability without exposing its facet.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use partsbin_core::{
    validate_fields, CapabilitySet, ConnectionTestResult, Credentials, FieldDefinition, FileType,
    ImportResult, OrderInfo, PartSearchResult, PricingBreak, SupplierCapability, SupplierConfig,
    SupplierInfo,
};
use partsbin_scraper::normalize_key;
use serde_json::{Map, Value};

use crate::error::SupplierError;
use crate::import::{self, ColumnMapping, MappedRow};

/// Group of operations an adapter exposes as one trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Search,
    Details,
    OrderImport,
}

/// The facet implementing `capability`.
#[must_use]
pub const fn facet_for(capability: SupplierCapability) -> Facet {
    match capability {
        SupplierCapability::SearchParts
        | SupplierCapability::BulkSearch
        | SupplierCapability::ParametricSearch => Facet::Search,
        SupplierCapability::GetPartDetails
        | SupplierCapability::FetchDatasheet
        | SupplierCapability::FetchImage
        | SupplierCapability::FetchPricing
        | SupplierCapability::FetchStock
        | SupplierCapability::FetchSpecifications => Facet::Details,
        SupplierCapability::ImportOrders => Facet::OrderImport,
    }
}

#[async_trait]
pub trait SupplierAdapter: Send + Sync + Debug {
    fn info(&self) -> SupplierInfo;

    fn capabilities(&self) -> CapabilitySet;

    fn credential_schema(&self) -> Vec<FieldDefinition> {
        Vec::new()
    }

    fn configuration_schema(&self) -> Vec<FieldDefinition> {
        Vec::new()
    }

    /// Stores credentials and configuration after validating them against
    /// the schemas. Calling it again replaces the previous state.
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] listing every schema issue.
    fn configure(
        &mut self,
        credentials: Credentials,
        config: SupplierConfig,
    ) -> Result<(), SupplierError>;

    fn is_configured(&self) -> bool;

    /// Establishes or validates a session. Public APIs return `Ok(true)`.
    async fn authenticate(&self) -> Result<bool, SupplierError> {
        Ok(true)
    }

    /// Health check round trip. Never fails: errors are folded into the result.
    async fn test_connection(&self) -> ConnectionTestResult;

    /// Minimum spacing between consecutive outbound calls of this adapter.
    fn rate_limit_delay(&self) -> Duration;

    fn search(&self) -> Option<&dyn PartSearch> {
        None
    }

    fn details(&self) -> Option<&dyn PartDetails> {
        None
    }

    fn order_import(&self) -> Option<&dyn OrderImport> {
        None
    }

    /// `true` when the facet backing `capability` is exposed.
    fn has_facet(&self, capability: SupplierCapability) -> bool {
        match facet_for(capability) {
            Facet::Search => self.search().is_some(),
            Facet::Details => self.details().is_some(),
            Facet::OrderImport => self.order_import().is_some(),
        }
    }
}

/// Checks `credentials` and `config` against an adapter's schemas and
/// returns the configuration with schema defaults filled in.
///
/// # Errors
///
/// Returns [`SupplierError::Configuration`] listing every issue found.
pub fn validate_settings(
    supplier: &str,
    credential_schema: &[FieldDefinition],
    configuration_schema: &[FieldDefinition],
    credentials: &Credentials,
    config: &SupplierConfig,
) -> Result<SupplierConfig, SupplierError> {
    let mut issues = validate_fields(credential_schema, &credentials.to_values())
        .err()
        .unwrap_or_default();
    let effective = match validate_fields(configuration_schema, config.values()) {
        Ok(effective) => Some(effective),
        Err(config_issues) => {
            issues.extend(config_issues);
            None
        }
    };

    match effective {
        Some(effective) if issues.is_empty() => Ok(SupplierConfig::from(effective)),
        _ => {
            let message = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            Err(SupplierError::configuration(supplier, message))
        }
    }
}

#[async_trait]
pub trait PartSearch: Send + Sync {
    async fn search_parts(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PartSearchResult>, SupplierError>;

    /// Runs one search per query, sequentially, keyed by query.
    async fn bulk_search(
        &self,
        queries: &[String],
        limit: usize,
    ) -> Result<BTreeMap<String, Vec<PartSearchResult>>, SupplierError> {
        let mut results = BTreeMap::new();
        for query in queries {
            let found = self.search_parts(query, limit).await?;
            results.insert(query.clone(), found);
        }
        Ok(results)
    }

    /// Keyword search narrowed client-side: every filter must match a
    /// specification of the same normalized name (case-insensitive substring).
    async fn parametric_search(
        &self,
        query: &str,
        filters: &BTreeMap<String, String>,
        limit: usize,
    ) -> Result<Vec<PartSearchResult>, SupplierError> {
        let candidates = self.search_parts(query, limit.saturating_mul(4).max(limit)).await?;
        Ok(candidates
            .into_iter()
            .filter(|part| matches_filters(part, filters))
            .take(limit)
            .collect())
    }
}

pub(crate) fn matches_filters(part: &PartSearchResult, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(name, wanted)| {
        let wanted = wanted.trim().to_lowercase();
        part.specifications
            .get(&normalize_key(name))
            .is_some_and(|value| value.to_lowercase().contains(&wanted))
    })
}

/// Per-part lookups. The `fetch_*` operations default to projections of
/// [`PartDetails::get_part_details`]; adapters with cheaper endpoints override them.
#[async_trait]
pub trait PartDetails: Send + Sync {
    /// Full record for `part_number`, or `Ok(None)` when the supplier does not know it.
    async fn get_part_details(
        &self,
        part_number: &str,
    ) -> Result<Option<PartSearchResult>, SupplierError>;

    async fn fetch_datasheet(&self, part_number: &str) -> Result<Option<String>, SupplierError> {
        Ok(self
            .get_part_details(part_number)
            .await?
            .and_then(|p| p.datasheet_url))
    }

    async fn fetch_image(&self, part_number: &str) -> Result<Option<String>, SupplierError> {
        Ok(self
            .get_part_details(part_number)
            .await?
            .and_then(|p| p.image_url))
    }

    async fn fetch_pricing(
        &self,
        part_number: &str,
    ) -> Result<Option<Vec<PricingBreak>>, SupplierError> {
        Ok(self
            .get_part_details(part_number)
            .await?
            .and_then(PartSearchResult::into_pricing))
    }

    async fn fetch_stock(&self, part_number: &str) -> Result<Option<u64>, SupplierError> {
        Ok(self
            .get_part_details(part_number)
            .await?
            .and_then(|p| p.stock_quantity))
    }

    async fn fetch_specifications(
        &self,
        part_number: &str,
    ) -> Result<Option<BTreeMap<String, String>>, SupplierError> {
        Ok(self
            .get_part_details(part_number)
            .await?
            .map(|p| p.specifications)
            .filter(|specs| !specs.is_empty()))
    }
}

/// Order-file import. Only [`OrderImport::column_mapping`] and
/// [`OrderImport::build_additional_properties`] are supplier specific; the
/// reading, header detection and row mapping are shared.
pub trait OrderImport: Send + Sync {
    /// Display name stamped on every imported part.
    fn supplier_display_name(&self) -> String;

    fn column_mapping(&self) -> ColumnMapping;

    fn supported_file_types(&self) -> Vec<FileType> {
        vec![FileType::Csv]
    }

    /// Cheap pre-check: the extension is supported and, when `content` is
    /// given, a header row matching this supplier's columns can be found.
    fn can_import_file(&self, filename: &str, content: Option<&[u8]>) -> bool {
        let Some(file_type) = FileType::from_filename(filename) else {
            return false;
        };
        if !self.supported_file_types().contains(&file_type) {
            return false;
        }
        content.is_none_or(|bytes| import::detect_columns(bytes, file_type, &self.column_mapping()))
    }

    /// Order number and date encoded in the export's file name.
    fn extract_order_info(&self, _filename: &str) -> OrderInfo {
        OrderInfo::default()
    }

    /// Supplier-specific extras for one mapped row.
    fn build_additional_properties(&self, row: &MappedRow, order: &OrderInfo) -> Map<String, Value> {
        import::standard_additional_properties(&self.supplier_display_name(), row, order)
    }

    /// Parses `content` into canonical import records. Never fails: problems
    /// are reported through [`ImportResult::error_message`] and warnings.
    fn import_order_file(&self, content: &[u8], file_type: FileType, filename: &str) -> ImportResult {
        import::import_order(self, content, file_type, filename)
    }
}
