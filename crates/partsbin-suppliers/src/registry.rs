//! Name-keyed factory registry, populated explicitly at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use partsbin_core::{CapabilitySet, FieldDefinition, SupplierCapability, SupplierInfo};
use partsbin_scraper::PageRenderer;
use serde::Serialize;

use crate::adapters::{BoltDepotAdapter, DigiKeyAdapter, LcscAdapter, MouserAdapter};
use crate::contract::SupplierAdapter;
use crate::error::{RegistryError, SupplierError};
use crate::gated::GatedSupplier;
use crate::http::HttpSettings;

pub type SupplierFactory =
    Arc<dyn Fn(&HttpSettings) -> Result<Box<dyn SupplierAdapter>, SupplierError> + Send + Sync>;

/// Static description of a registered adapter, for listings and forms.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierDescription {
    pub info: SupplierInfo,
    pub capabilities: CapabilitySet,
    pub credential_schema: Vec<FieldDefinition>,
    pub configuration_schema: Vec<FieldDefinition>,
}

struct RegistryEntry {
    factory: SupplierFactory,
    description: SupplierDescription,
}

/// Creates adapters by name. Every [`SupplierRegistry::get`] returns a fresh,
/// unconfigured instance.
pub struct SupplierRegistry {
    settings: HttpSettings,
    entries: BTreeMap<String, RegistryEntry>,
}

impl std::fmt::Debug for SupplierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupplierRegistry")
            .field("suppliers", &self.list_names())
            .finish_non_exhaustive()
    }
}

impl SupplierRegistry {
    #[must_use]
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            settings,
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in adapter.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a built-in adapter fails registration checks.
    pub fn with_defaults(settings: HttpSettings) -> Result<Self, RegistryError> {
        Self::with_renderer(settings, None)
    }

    /// Like [`Self::with_defaults`], with `renderer` handed to the scraping
    /// adapters for pages that need a browser.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a built-in adapter fails registration checks.
    pub fn with_renderer(
        settings: HttpSettings,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(settings);
        registry.register("lcsc", |s: &HttpSettings| {
            Ok(Box::new(LcscAdapter::new(s)?) as Box<dyn SupplierAdapter>)
        })?;
        registry.register("mouser", |s: &HttpSettings| {
            Ok(Box::new(MouserAdapter::new(s)?) as Box<dyn SupplierAdapter>)
        })?;
        registry.register("digikey", |s: &HttpSettings| {
            Ok(Box::new(DigiKeyAdapter::new(s)?) as Box<dyn SupplierAdapter>)
        })?;
        registry.register("boltdepot", move |s: &HttpSettings| {
            let adapter = BoltDepotAdapter::new(s)?;
            let adapter = match &renderer {
                Some(renderer) => adapter.with_renderer(Arc::clone(renderer)),
                None => adapter,
            };
            Ok(Box::new(adapter) as Box<dyn SupplierAdapter>)
        })?;
        Ok(registry)
    }

    /// Registers `factory` under `name` after instantiating it once to check
    /// that the reported name matches and every declared capability has its
    /// facet.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidName`] unless `name` is non-empty lower-case without whitespace
    /// - [`RegistryError::DuplicateSupplier`] when `name` is taken
    /// - [`RegistryError::Construction`] when the factory fails
    /// - [`RegistryError::NameMismatch`] / [`RegistryError::MissingFacet`] for inconsistent adapters
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&HttpSettings) -> Result<Box<dyn SupplierAdapter>, SupplierError> + Send + Sync + 'static,
    {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_uppercase()) {
            return Err(RegistryError::InvalidName(name.to_owned()));
        }
        if self.entries.contains_key(name) {
            return Err(RegistryError::DuplicateSupplier(name.to_owned()));
        }

        let adapter = factory(&self.settings).map_err(|source| RegistryError::Construction {
            supplier: name.to_owned(),
            source,
        })?;
        let info = adapter.info();
        if info.name != name {
            return Err(RegistryError::NameMismatch {
                registered: name.to_owned(),
                reported: info.name,
            });
        }
        let capabilities = adapter.capabilities();
        if let Some(capability) = first_missing_facet(adapter.as_ref(), &capabilities) {
            return Err(RegistryError::MissingFacet {
                supplier: name.to_owned(),
                capability,
            });
        }

        tracing::debug!(supplier = name, capabilities = capabilities.len(), "supplier registered");
        let description = SupplierDescription {
            credential_schema: adapter.credential_schema(),
            configuration_schema: adapter.configuration_schema(),
            info,
            capabilities,
        };
        self.entries.insert(
            name.to_owned(),
            RegistryEntry {
                factory: Arc::new(factory),
                description,
            },
        );
        Ok(())
    }

    /// A new, unconfigured adapter instance.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownSupplier`] for unregistered names (case-sensitive).
    pub fn get(&self, name: &str) -> Result<Box<dyn SupplierAdapter>, RegistryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSupplier(name.to_owned()))?;
        (entry.factory)(&self.settings).map_err(|source| RegistryError::Construction {
            supplier: name.to_owned(),
            source,
        })
    }

    /// [`Self::get`] wrapped in a [`GatedSupplier`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub fn gated(&self, name: &str) -> Result<GatedSupplier, RegistryError> {
        self.get(name).map(GatedSupplier::new)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn list_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    #[must_use]
    pub fn describe_all(&self) -> Vec<SupplierDescription> {
        self.entries
            .values()
            .map(|entry| entry.description.clone())
            .collect()
    }
}

fn first_missing_facet(
    adapter: &dyn SupplierAdapter,
    capabilities: &CapabilitySet,
) -> Option<SupplierCapability> {
    capabilities
        .iter()
        .copied()
        .find(|capability| !adapter.has_facet(*capability))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
