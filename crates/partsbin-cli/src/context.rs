use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use partsbin_core::{load_supplier_settings, AppConfig, SupplierSettings, SuppliersFile};
use partsbin_scraper::{ChromeRenderer, PageRenderer};
use partsbin_suppliers::{
    CredentialProvider, EnvCredentialProvider, GatedSupplier, HttpSettings, SupplierRegistry,
};

/// Everything a command needs: the registry, per-supplier settings and the
/// credential source.
pub(crate) struct Context {
    pub(crate) config: AppConfig,
    pub(crate) registry: SupplierRegistry,
    settings: SuppliersFile,
    credentials: EnvCredentialProvider,
}

impl Context {
    pub(crate) fn new(config: AppConfig) -> anyhow::Result<Self> {
        let renderer = ChromeRenderer::discover(
            config.browser_path.as_deref(),
            Duration::from_secs(config.browser_timeout_secs),
        )
        .map(|r| Arc::new(r) as Arc<dyn PageRenderer>);
        if renderer.is_none() {
            tracing::debug!("no headless browser found; rendered scraping disabled");
        }

        let registry =
            SupplierRegistry::with_renderer(HttpSettings::from_app_config(&config), renderer)
                .context("failed to build supplier registry")?;

        let settings = if config.suppliers_path.exists() {
            load_supplier_settings(&config.suppliers_path)?
        } else {
            tracing::warn!(
                path = %config.suppliers_path.display(),
                "supplier settings file not found; using adapter defaults"
            );
            SuppliersFile::default()
        };

        for entry in &settings.suppliers {
            if !registry.contains(&entry.name) {
                tracing::warn!(supplier = %entry.name, "settings name an unregistered supplier");
            }
        }

        Ok(Self {
            config,
            registry,
            settings,
            credentials: EnvCredentialProvider::from_env(),
        })
    }

    pub(crate) fn is_enabled(&self, name: &str) -> bool {
        self.settings.get(name).is_none_or(|s| s.enabled)
    }

    /// A configured, capability-gated adapter for `name`.
    pub(crate) fn supplier(&self, name: &str) -> anyhow::Result<GatedSupplier> {
        if !self.is_enabled(name) {
            bail!(
                "supplier '{name}' is disabled in {}",
                self.config.suppliers_path.display()
            );
        }

        let mut supplier = self.registry.gated(name)?;
        let credentials = self
            .credentials
            .credentials_for(name, &supplier.adapter().credential_schema());
        let config = self
            .settings
            .get(name)
            .map(SupplierSettings::supplier_config)
            .unwrap_or_default();
        supplier
            .configure(credentials, config)
            .with_context(|| format!("failed to configure supplier '{name}'"))?;

        tracing::debug!(supplier = name, "supplier configured");
        Ok(supplier)
    }
}
