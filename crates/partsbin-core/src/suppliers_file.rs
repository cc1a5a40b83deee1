use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::SupplierConfig;
use crate::ConfigError;

fn default_enabled() -> bool {
    true
}

/// Per-supplier settings from the suppliers YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierSettings {
    /// Registry name (`lcsc`, `mouser`, ...).
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Non-secret configuration handed to `configure()`.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

impl SupplierSettings {
    #[must_use]
    pub fn supplier_config(&self) -> SupplierConfig {
        SupplierConfig::from(self.config.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SuppliersFile {
    #[serde(default)]
    pub suppliers: Vec<SupplierSettings>,
}

impl SuppliersFile {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SupplierSettings> {
        self.suppliers.iter().find(|s| s.name == name)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SupplierSettings> {
        self.suppliers.iter().filter(|s| s.enabled)
    }
}

/// Load and validate the supplier settings from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_supplier_settings(path: &Path) -> Result<SuppliersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SuppliersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_supplier_settings(&content)
}

/// Parse and validate supplier settings from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text is not valid YAML or fails validation.
pub fn parse_supplier_settings(content: &str) -> Result<SuppliersFile, ConfigError> {
    let file: SuppliersFile = serde_yaml::from_str(content)?;
    validate_suppliers(&file)?;
    Ok(file)
}

fn validate_suppliers(file: &SuppliersFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for supplier in &file.suppliers {
        let name = supplier.name.as_str();
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "supplier name must be non-empty".to_string(),
            ));
        }

        if name != name.to_ascii_lowercase() || name.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "supplier name '{name}' must be lower-case with no whitespace"
            )));
        }

        if !seen.insert(name) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier name: '{name}'"
            )));
        }
    }

    Ok(())
}
