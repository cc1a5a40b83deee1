//! Built-in supplier adapters.

mod boltdepot;
mod digikey;
mod lcsc;
mod mouser;

use partsbin_core::ConnectionTestResult;

use crate::error::SupplierError;

pub use self::boltdepot::BoltDepotAdapter;
pub use self::digikey::DigiKeyAdapter;
pub use self::lcsc::LcscAdapter;
pub use self::mouser::MouserAdapter;

/// Folds a health-check outcome into the never-failing result shape.
fn connection_result(supplier: &str, outcome: Result<String, SupplierError>) -> ConnectionTestResult {
    match outcome {
        Ok(message) => ConnectionTestResult::ok(message).with_detail("supplier", supplier),
        Err(e) => {
            tracing::warn!(supplier, error = %e, "connection test failed");
            ConnectionTestResult::failed(e.to_string())
                .with_detail("supplier", supplier)
                .with_detail("error_kind", e.kind())
                .with_detail("retryable", e.is_retryable())
        }
    }
}

fn log_extraction_warnings(supplier: &str, part_number: &str, warnings: &[String]) {
    if !warnings.is_empty() {
        tracing::debug!(supplier, part_number, ?warnings, "partial extraction");
    }
}
