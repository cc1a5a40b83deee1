use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, PartSearchResult, PricingBreak,
    SupplierCapability, SupplierConfig, SupplierInfo,
};

use super::*;
use crate::contract::{PartDetails, SupplierAdapter};

#[derive(Debug, Default)]
struct CountingAdapter {
    detail_calls: Arc<AtomicUsize>,
}

impl CountingAdapter {
    fn gated() -> (GatedSupplier, Arc<AtomicUsize>) {
        let adapter = Self::default();
        let calls = Arc::clone(&adapter.detail_calls);
        (GatedSupplier::new(Box::new(adapter)), calls)
    }
}

#[async_trait]
impl SupplierAdapter for CountingAdapter {
    fn info(&self) -> SupplierInfo {
        SupplierInfo {
            name: "counting".to_owned(),
            display_name: "Counting Parts".to_owned(),
            description: "test double".to_owned(),
            website_url: "https://example.com".to_owned(),
            api_documentation_url: None,
            supports_oauth: false,
            rate_limit_info: None,
            supported_file_types: Vec::new(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from([
            SupplierCapability::GetPartDetails,
            SupplierCapability::FetchPricing,
            SupplierCapability::FetchStock,
        ])
    }

    fn configure(&mut self, _: Credentials, _: SupplierConfig) -> Result<(), SupplierError> {
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        ConnectionTestResult::ok("fine")
    }

    fn rate_limit_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn details(&self) -> Option<&dyn PartDetails> {
        Some(self)
    }
}

#[async_trait]
impl PartDetails for CountingAdapter {
    async fn get_part_details(&self, part_number: &str) -> Result<Option<PartSearchResult>, SupplierError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        match part_number {
            "MISSING" => Ok(None),
            "FLAKY" => Err(SupplierError::connection("counting", "connection reset")),
            "LOCKED" => Err(SupplierError::authentication("counting", "key revoked")),
            _ => {
                let mut part = PartSearchResult::new(part_number);
                part.stock_quantity = Some(42);
                part.datasheet_url = Some("https://example.com/ds.pdf".to_owned());
                part.set_pricing(vec![PricingBreak::new(1, 0.5, "USD")]);
                Ok(Some(part))
            }
        }
    }
}

#[tokio::test]
async fn undeclared_capability_never_reaches_adapter() {
    let (gated, calls) = CountingAdapter::gated();

    let err = gated.fetch_datasheet("NE555").await.unwrap_err();
    assert!(matches!(
        err,
        SupplierError::UnsupportedCapability {
            capability: SupplierCapability::FetchDatasheet,
            ..
        }
    ));
    assert!(gated.search_parts("NE555", 5).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn declared_capability_dispatches() {
    let (gated, calls) = CountingAdapter::gated();
    assert_eq!(gated.fetch_stock("NE555").await.unwrap(), Some(42));
    assert_eq!(gated.fetch_stock("MISSING").await.unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn import_is_gated_too() {
    let (gated, _) = CountingAdapter::gated();
    assert!(!gated.can_import_file("order.csv", None));
    let err = gated
        .import_order_file(b"a,b", partsbin_core::FileType::Csv, "order.csv")
        .unwrap_err();
    assert_eq!(err.kind(), "unsupported_capability");
}

#[tokio::test]
async fn enrich_records_one_outcome_per_capability() {
    let (gated, calls) = CountingAdapter::gated();
    let mut seen = Vec::new();

    let report = gated
        .enrich(
            "NE555",
            &[
                SupplierCapability::FetchPricing,
                SupplierCapability::FetchDatasheet,
                SupplierCapability::FetchStock,
            ],
            |progress| seen.push((progress.completed, progress.total, progress.percent())),
        )
        .await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.found_count(), 2);
    assert_eq!(
        report.outcome(SupplierCapability::FetchDatasheet),
        Some(&EnrichmentOutcome::Unsupported)
    );
    assert!(matches!(
        report.outcome(SupplierCapability::FetchStock),
        Some(EnrichmentOutcome::Found { data }) if *data == serde_json::json!(42)
    ));
    assert_eq!(seen, vec![(1, 3, 33), (2, 3, 66), (3, 3, 100)]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn enrich_keeps_going_after_failures() {
    let (gated, _) = CountingAdapter::gated();

    let report = gated
        .enrich(
            "FLAKY",
            &[SupplierCapability::FetchPricing, SupplierCapability::FetchStock],
            |_| {},
        )
        .await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(
        report.retryable_failures(),
        vec![SupplierCapability::FetchPricing, SupplierCapability::FetchStock]
    );

    let report = gated
        .enrich("LOCKED", &[SupplierCapability::GetPartDetails], |_| {})
        .await;
    assert!(matches!(
        report.outcome(SupplierCapability::GetPartDetails),
        Some(EnrichmentOutcome::Failed { retryable: false, .. })
    ));
    assert!(report.retryable_failures().is_empty());

    let report = gated
        .enrich("MISSING", &[SupplierCapability::FetchPricing], |_| {})
        .await;
    assert_eq!(
        report.outcome(SupplierCapability::FetchPricing),
        Some(&EnrichmentOutcome::NotFound)
    );
}

#[test]
fn outcome_serializes_with_status_tag() {
    let outcome = CapabilityOutcome {
        capability: SupplierCapability::FetchStock,
        outcome: EnrichmentOutcome::Failed {
            error: "timeout".to_owned(),
            retryable: true,
        },
    };
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        serde_json::json!({
            "capability": "fetch_stock",
            "status": "failed",
            "error": "timeout",
            "retryable": true
        })
    );
}
