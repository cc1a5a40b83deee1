//! Credential sources. Adapters receive decrypted maps and never see how
//! they are stored.

use std::collections::HashMap;

use partsbin_core::{Credentials, FieldDefinition};

pub trait CredentialProvider: Send + Sync {
    /// Decrypted credentials for `supplier`, limited to the fields in `schema`.
    /// Absent fields are simply missing from the map.
    fn credentials_for(&self, supplier: &str, schema: &[FieldDefinition]) -> Credentials;
}

/// Reads `PARTSBIN_<SUPPLIER>_<FIELD>` variables, e.g. `PARTSBIN_MOUSER_API_KEY`.
pub struct EnvCredentialProvider {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvCredentialProvider {
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Variable name holding `field` for `supplier`.
    #[must_use]
    pub fn var_name(supplier: &str, field: &str) -> String {
        format!("PARTSBIN_{}_{}", env_segment(supplier), env_segment(field))
    }
}

impl std::fmt::Debug for EnvCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCredentialProvider").finish_non_exhaustive()
    }
}

fn env_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl CredentialProvider for EnvCredentialProvider {
    fn credentials_for(&self, supplier: &str, schema: &[FieldDefinition]) -> Credentials {
        let mut credentials = Credentials::new();
        for field in schema {
            let var = Self::var_name(supplier, &field.name);
            if let Some(value) = (self.lookup)(&var).filter(|v| !v.trim().is_empty()) {
                credentials.insert(&field.name, &value);
            } else if field.required {
                tracing::debug!(supplier, var, "credential variable not set");
            }
        }
        credentials
    }
}

/// In-memory credentials keyed by supplier name.
#[derive(Debug, Default)]
pub struct StaticCredentialProvider {
    by_supplier: HashMap<String, Credentials>,
}

impl StaticCredentialProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, supplier: &str, credentials: Credentials) -> Self {
        self.by_supplier.insert(supplier.to_owned(), credentials);
        self
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credentials_for(&self, supplier: &str, _schema: &[FieldDefinition]) -> Credentials {
        self.by_supplier.get(supplier).cloned().unwrap_or_default()
    }
}
