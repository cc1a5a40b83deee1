//! Capability-checked dispatch and the per-part enrichment runner.

use std::collections::BTreeMap;

use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, FileType, ImportResult, PartSearchResult,
    PricingBreak, SupplierCapability, SupplierConfig, SupplierInfo,
};
use serde::Serialize;
use serde_json::Value;

use crate::contract::{OrderImport, PartDetails, PartSearch, SupplierAdapter};
use crate::error::SupplierError;

/// Result of one enrichment call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    Found { data: Value },
    NotFound,
    Failed { error: String, retryable: bool },
    Unsupported,
}

impl EnrichmentOutcome {
    fn from_result<T: Serialize>(result: Result<Option<T>, SupplierError>) -> Self {
        match result {
            Ok(Some(value)) => match serde_json::to_value(value) {
                Ok(data) => Self::Found { data },
                Err(e) => Self::Failed {
                    error: format!("could not serialize result: {e}"),
                    retryable: false,
                },
            },
            Ok(None) => Self::NotFound,
            Err(SupplierError::UnsupportedCapability { .. }) => Self::Unsupported,
            Err(e) => Self::Failed {
                retryable: e.is_retryable(),
                error: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityOutcome {
    pub capability: SupplierCapability,
    #[serde(flatten)]
    pub outcome: EnrichmentOutcome,
}

/// Reported to the progress callback after each capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentProgress {
    pub capability: SupplierCapability,
    pub completed: usize,
    pub total: usize,
}

impl EnrichmentProgress {
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        u8::try_from(self.completed * 100 / self.total).unwrap_or(100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentReport {
    pub supplier: String,
    pub part_number: String,
    pub results: Vec<CapabilityOutcome>,
}

impl EnrichmentReport {
    #[must_use]
    pub fn found_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_found()).count()
    }

    #[must_use]
    pub fn outcome(&self, capability: SupplierCapability) -> Option<&EnrichmentOutcome> {
        self.results
            .iter()
            .find(|r| r.capability == capability)
            .map(|r| &r.outcome)
    }

    /// Failures worth scheduling again.
    #[must_use]
    pub fn retryable_failures(&self) -> Vec<SupplierCapability> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, EnrichmentOutcome::Failed { retryable: true, .. }))
            .map(|r| r.capability)
            .collect()
    }
}

/// Wraps an adapter so that no operation outside its declared capability
/// set ever reaches it.
#[derive(Debug)]
pub struct GatedSupplier {
    adapter: Box<dyn SupplierAdapter>,
    name: String,
    capabilities: CapabilitySet,
}

impl GatedSupplier {
    #[must_use]
    pub fn new(adapter: Box<dyn SupplierAdapter>) -> Self {
        Self {
            name: adapter.info().name,
            capabilities: adapter.capabilities(),
            adapter,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn info(&self) -> SupplierInfo {
        self.adapter.info()
    }

    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    #[must_use]
    pub fn supports(&self, capability: SupplierCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    #[must_use]
    pub fn adapter(&self) -> &dyn SupplierAdapter {
        self.adapter.as_ref()
    }

    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] when the values do not
    /// satisfy the adapter's schemas.
    pub fn configure(
        &mut self,
        credentials: Credentials,
        config: SupplierConfig,
    ) -> Result<(), SupplierError> {
        self.adapter.configure(credentials, config)
    }

    /// # Errors
    ///
    /// Propagates the adapter's authentication failure.
    pub async fn authenticate(&self) -> Result<bool, SupplierError> {
        self.adapter.authenticate().await
    }

    pub async fn test_connection(&self) -> ConnectionTestResult {
        self.adapter.test_connection().await
    }

    fn require(&self, capability: SupplierCapability) -> Result<(), SupplierError> {
        if self.supports(capability) {
            Ok(())
        } else {
            tracing::debug!(supplier = %self.name, %capability, "blocked undeclared capability");
            Err(SupplierError::unsupported(&self.name, capability))
        }
    }

    fn search_facet(&self, capability: SupplierCapability) -> Result<&dyn PartSearch, SupplierError> {
        self.require(capability)?;
        self.adapter
            .search()
            .ok_or_else(|| SupplierError::unsupported(&self.name, capability))
    }

    fn details_facet(&self, capability: SupplierCapability) -> Result<&dyn PartDetails, SupplierError> {
        self.require(capability)?;
        self.adapter
            .details()
            .ok_or_else(|| SupplierError::unsupported(&self.name, capability))
    }

    fn import_facet(&self) -> Result<&dyn OrderImport, SupplierError> {
        self.require(SupplierCapability::ImportOrders)?;
        self.adapter
            .order_import()
            .ok_or_else(|| SupplierError::unsupported(&self.name, SupplierCapability::ImportOrders))
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn search_parts(&self, query: &str, limit: usize) -> Result<Vec<PartSearchResult>, SupplierError> {
        self.search_facet(SupplierCapability::SearchParts)?
            .search_parts(query, limit)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn bulk_search(
        &self,
        queries: &[String],
        limit: usize,
    ) -> Result<BTreeMap<String, Vec<PartSearchResult>>, SupplierError> {
        self.search_facet(SupplierCapability::BulkSearch)?
            .bulk_search(queries, limit)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn parametric_search(
        &self,
        query: &str,
        filters: &BTreeMap<String, String>,
        limit: usize,
    ) -> Result<Vec<PartSearchResult>, SupplierError> {
        self.search_facet(SupplierCapability::ParametricSearch)?
            .parametric_search(query, filters, limit)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn get_part_details(&self, part_number: &str) -> Result<Option<PartSearchResult>, SupplierError> {
        self.details_facet(SupplierCapability::GetPartDetails)?
            .get_part_details(part_number)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn fetch_datasheet(&self, part_number: &str) -> Result<Option<String>, SupplierError> {
        self.details_facet(SupplierCapability::FetchDatasheet)?
            .fetch_datasheet(part_number)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn fetch_image(&self, part_number: &str) -> Result<Option<String>, SupplierError> {
        self.details_facet(SupplierCapability::FetchImage)?
            .fetch_image(part_number)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn fetch_pricing(&self, part_number: &str) -> Result<Option<Vec<PricingBreak>>, SupplierError> {
        self.details_facet(SupplierCapability::FetchPricing)?
            .fetch_pricing(part_number)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn fetch_stock(&self, part_number: &str) -> Result<Option<u64>, SupplierError> {
        self.details_facet(SupplierCapability::FetchStock)?
            .fetch_stock(part_number)
            .await
    }

    /// # Errors
    ///
    /// [`SupplierError::UnsupportedCapability`] when undeclared, otherwise the adapter's error.
    pub async fn fetch_specifications(
        &self,
        part_number: &str,
    ) -> Result<Option<BTreeMap<String, String>>, SupplierError> {
        self.details_facet(SupplierCapability::FetchSpecifications)?
            .fetch_specifications(part_number)
            .await
    }

    /// `false` when order import is undeclared.
    #[must_use]
    pub fn can_import_file(&self, filename: &str, content: Option<&[u8]>) -> bool {
        self.import_facet()
            .is_ok_and(|facet| facet.can_import_file(filename, content))
    }

    /// # Errors
    ///
    /// Only [`SupplierError::UnsupportedCapability`]; parse problems are
    /// reported inside the [`ImportResult`].
    pub fn import_order_file(
        &self,
        content: &[u8],
        file_type: FileType,
        filename: &str,
    ) -> Result<ImportResult, SupplierError> {
        Ok(self.import_facet()?.import_order_file(content, file_type, filename))
    }

    /// Runs each requested capability once, in order, recording one outcome
    /// per capability. Capabilities that are not per-part lookups, or that
    /// the adapter does not declare, are reported as `Unsupported`.
    pub async fn enrich(
        &self,
        part_number: &str,
        capabilities: &[SupplierCapability],
        mut progress: impl FnMut(EnrichmentProgress) + Send,
    ) -> EnrichmentReport {
        let total = capabilities.len();
        let mut results = Vec::with_capacity(total);

        for (index, capability) in capabilities.iter().copied().enumerate() {
            let outcome = self.enrich_one(part_number, capability).await;
            match &outcome {
                EnrichmentOutcome::Failed { error, retryable } => tracing::warn!(
                    supplier = %self.name,
                    part_number,
                    %capability,
                    retryable,
                    error = %error,
                    "enrichment call failed"
                ),
                other => tracing::debug!(
                    supplier = %self.name,
                    part_number,
                    %capability,
                    found = other.is_found(),
                    "enrichment call finished"
                ),
            }
            results.push(CapabilityOutcome { capability, outcome });
            progress(EnrichmentProgress {
                capability,
                completed: index + 1,
                total,
            });
        }

        EnrichmentReport {
            supplier: self.name.clone(),
            part_number: part_number.to_owned(),
            results,
        }
    }

    async fn enrich_one(&self, part_number: &str, capability: SupplierCapability) -> EnrichmentOutcome {
        match capability {
            SupplierCapability::GetPartDetails => {
                EnrichmentOutcome::from_result(self.get_part_details(part_number).await)
            }
            SupplierCapability::FetchDatasheet => {
                EnrichmentOutcome::from_result(self.fetch_datasheet(part_number).await)
            }
            SupplierCapability::FetchImage => {
                EnrichmentOutcome::from_result(self.fetch_image(part_number).await)
            }
            SupplierCapability::FetchPricing => {
                EnrichmentOutcome::from_result(self.fetch_pricing(part_number).await)
            }
            SupplierCapability::FetchStock => {
                EnrichmentOutcome::from_result(self.fetch_stock(part_number).await)
            }
            SupplierCapability::FetchSpecifications => {
                EnrichmentOutcome::from_result(self.fetch_specifications(part_number).await)
            }
            SupplierCapability::SearchParts
            | SupplierCapability::BulkSearch
            | SupplierCapability::ParametricSearch
            | SupplierCapability::ImportOrders => EnrichmentOutcome::Unsupported,
        }
    }
}

#[cfg(test)]
#[path = "gated_test.rs"]
mod tests;
