pub mod app_config;
pub mod capability;
pub mod config;
pub mod credentials;
pub mod extraction;
pub mod fields;
pub mod import;
pub mod part;
pub mod supplier;
pub mod suppliers_file;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use capability::{CapabilitySet, SupplierCapability};
pub use config::{load_app_config, load_app_config_from_env};
pub use credentials::{Credentials, SupplierConfig};
pub use extraction::ExtractionResult;
pub use fields::{validate_fields, FieldDefinition, FieldIssue, FieldOption, FieldType};
pub use import::{FileType, ImportResult, ImportedPart, OrderInfo};
pub use part::{PartSearchResult, PricingBreak};
pub use supplier::{ConnectionTestResult, SupplierInfo};
pub use suppliers_file::{
    load_supplier_settings, parse_supplier_settings, SupplierSettings, SuppliersFile,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read supplier settings file {path}: {source}")]
    SuppliersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse supplier settings file: {0}")]
    SuppliersFileParse(#[from] serde_yaml::Error),

    #[error("supplier settings validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown supplier capability: {0}")]
    UnknownCapability(String),

    #[error("unknown order file type: {0}")]
    UnknownFileType(String),
}
