//! The closed set of operations a supplier adapter may declare.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// One operation a supplier adapter may support.
///
/// The wire identifier (used in configuration files and task APIs) is the
/// lower snake-case form, e.g. `"fetch_datasheet"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierCapability {
    SearchParts,
    GetPartDetails,
    FetchDatasheet,
    FetchImage,
    FetchPricing,
    FetchStock,
    FetchSpecifications,
    ImportOrders,
    BulkSearch,
    ParametricSearch,
}

/// Set of capabilities declared by one adapter.
pub type CapabilitySet = BTreeSet<SupplierCapability>;

impl SupplierCapability {
    pub const ALL: [SupplierCapability; 10] = [
        SupplierCapability::SearchParts,
        SupplierCapability::GetPartDetails,
        SupplierCapability::FetchDatasheet,
        SupplierCapability::FetchImage,
        SupplierCapability::FetchPricing,
        SupplierCapability::FetchStock,
        SupplierCapability::FetchSpecifications,
        SupplierCapability::ImportOrders,
        SupplierCapability::BulkSearch,
        SupplierCapability::ParametricSearch,
    ];

    /// Stable wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SupplierCapability::SearchParts => "search_parts",
            SupplierCapability::GetPartDetails => "get_part_details",
            SupplierCapability::FetchDatasheet => "fetch_datasheet",
            SupplierCapability::FetchImage => "fetch_image",
            SupplierCapability::FetchPricing => "fetch_pricing",
            SupplierCapability::FetchStock => "fetch_stock",
            SupplierCapability::FetchSpecifications => "fetch_specifications",
            SupplierCapability::ImportOrders => "import_orders",
            SupplierCapability::BulkSearch => "bulk_search",
            SupplierCapability::ParametricSearch => "parametric_search",
        }
    }

    /// `true` for the per-part enrichment operations (`fetch_*`).
    #[must_use]
    pub const fn is_enrichment(self) -> bool {
        matches!(
            self,
            SupplierCapability::FetchDatasheet
                | SupplierCapability::FetchImage
                | SupplierCapability::FetchPricing
                | SupplierCapability::FetchStock
                | SupplierCapability::FetchSpecifications
        )
    }
}

impl std::fmt::Display for SupplierCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplierCapability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SupplierCapability::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CoreError::UnknownCapability(s.to_owned()))
    }
}
