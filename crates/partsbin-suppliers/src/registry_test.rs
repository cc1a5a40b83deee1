use std::time::Duration;

use async_trait::async_trait;
use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, SupplierCapability, SupplierConfig,
    SupplierInfo,
};

use super::*;

/// Declares search without exposing the search facet.
#[derive(Debug)]
struct HollowAdapter {
    name: &'static str,
}

#[async_trait]
impl SupplierAdapter for HollowAdapter {
    fn info(&self) -> SupplierInfo {
        SupplierInfo {
            name: self.name.to_owned(),
            display_name: "Hollow".to_owned(),
            description: String::new(),
            website_url: "https://example.com".to_owned(),
            api_documentation_url: None,
            supports_oauth: false,
            rate_limit_info: None,
            supported_file_types: Vec::new(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from([SupplierCapability::SearchParts])
    }

    fn configure(&mut self, _: Credentials, _: SupplierConfig) -> Result<(), SupplierError> {
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        ConnectionTestResult::ok("ok")
    }

    fn rate_limit_delay(&self) -> Duration {
        Duration::ZERO
    }
}

fn hollow(name: &'static str) -> impl Fn(&HttpSettings) -> Result<Box<dyn SupplierAdapter>, SupplierError> {
    move |_| Ok(Box::new(HollowAdapter { name }) as Box<dyn SupplierAdapter>)
}

#[test]
fn defaults_register_all_builtin_suppliers() {
    let registry = SupplierRegistry::with_defaults(HttpSettings::no_retries()).unwrap();
    assert_eq!(
        registry.list_names(),
        vec!["boltdepot", "digikey", "lcsc", "mouser"]
    );
    for description in registry.describe_all() {
        assert!(!description.capabilities.is_empty(), "{}", description.info.name);
    }
}

#[test]
fn get_returns_fresh_unconfigured_instance() {
    let registry = SupplierRegistry::with_defaults(HttpSettings::no_retries()).unwrap();
    let adapter = registry.get("mouser").unwrap();
    assert_eq!(adapter.info().name, "mouser");
    assert!(!adapter.is_configured());
}

#[test]
fn unknown_and_wrong_case_names_are_rejected() {
    let registry = SupplierRegistry::with_defaults(HttpSettings::no_retries()).unwrap();
    assert!(matches!(
        registry.get("farnell"),
        Err(RegistryError::UnknownSupplier(ref n)) if n == "farnell"
    ));
    assert!(matches!(registry.get("LCSC"), Err(RegistryError::UnknownSupplier(_))));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = SupplierRegistry::with_defaults(HttpSettings::no_retries()).unwrap();
    let err = registry
        .register("lcsc", |s: &HttpSettings| {
            Ok(Box::new(crate::adapters::LcscAdapter::new(s)?) as Box<dyn SupplierAdapter>)
        })
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateSupplier(_)));
}

#[test]
fn adapter_missing_a_facet_is_rejected() {
    let mut registry = SupplierRegistry::new(HttpSettings::no_retries());
    let err = registry.register("hollow", hollow("hollow")).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::MissingFacet {
            capability: SupplierCapability::SearchParts,
            ..
        }
    ));
    assert!(!registry.contains("hollow"));
}

#[test]
fn name_must_match_reported_info() {
    let mut registry = SupplierRegistry::new(HttpSettings::no_retries());
    let err = registry.register("other", hollow("hollow")).unwrap_err();
    assert!(matches!(err, RegistryError::NameMismatch { .. }));
}

#[test]
fn invalid_names_are_rejected() {
    let mut registry = SupplierRegistry::new(HttpSettings::no_retries());
    for name in ["", "Hollow", "hol low"] {
        assert!(matches!(
            registry.register(name, hollow("hollow")),
            Err(RegistryError::InvalidName(_))
        ));
    }
}
