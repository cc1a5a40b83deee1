use std::time::Duration;

use partsbin_core::SupplierCapability;
use partsbin_scraper::Retriable;
use thiserror::Error;

/// Failures of a supplier adapter call.
///
/// "Not found" is not an error: detail lookups return `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum SupplierError {
    #[error("{supplier} is not configured correctly: {message}")]
    Configuration { supplier: String, message: String },

    #[error("authentication with {supplier} failed: {message}")]
    Authentication { supplier: String, message: String },

    #[error("could not reach {supplier}: {message}")]
    Connection { supplier: String, message: String },

    #[error("{supplier} rate limit exceeded{}", retry_hint(*.retry_after_secs))]
    RateLimit {
        supplier: String,
        retry_after_secs: Option<u64>,
    },

    #[error("{supplier} does not support {capability}")]
    UnsupportedCapability {
        supplier: String,
        capability: SupplierCapability,
    },

    #[error("invalid response from {supplier}: {message}")]
    InvalidResponse { supplier: String, message: String },
}

fn retry_hint(retry_after_secs: Option<u64>) -> String {
    retry_after_secs.map_or_else(String::new, |secs| format!(" (retry after {secs}s)"))
}

impl SupplierError {
    pub fn configuration(supplier: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            supplier: supplier.to_owned(),
            message: message.into(),
        }
    }

    pub fn authentication(supplier: &str, message: impl Into<String>) -> Self {
        Self::Authentication {
            supplier: supplier.to_owned(),
            message: message.into(),
        }
    }

    pub fn connection(supplier: &str, message: impl Into<String>) -> Self {
        Self::Connection {
            supplier: supplier.to_owned(),
            message: message.into(),
        }
    }

    pub fn invalid_response(supplier: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            supplier: supplier.to_owned(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported(supplier: &str, capability: SupplierCapability) -> Self {
        Self::UnsupportedCapability {
            supplier: supplier.to_owned(),
            capability,
        }
    }

    /// Transient: the same call may succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::RateLimit { .. })
    }

    /// The adapter cannot work until credentials or configuration change.
    #[must_use]
    pub fn is_unusable(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Authentication { .. })
    }

    /// Stable snake-case name of the variant, for structured logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Authentication { .. } => "authentication",
            Self::Connection { .. } => "connection",
            Self::RateLimit { .. } => "rate_limit",
            Self::UnsupportedCapability { .. } => "unsupported_capability",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}

impl Retriable for SupplierError {
    fn is_retriable(&self) -> bool {
        self.is_retryable()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown supplier: {0}")]
    UnknownSupplier(String),

    #[error("supplier already registered: {0}")]
    DuplicateSupplier(String),

    #[error("supplier name '{0}' must be non-empty lower-case without whitespace")]
    InvalidName(String),

    #[error("supplier registered as '{registered}' reports its name as '{reported}'")]
    NameMismatch { registered: String, reported: String },

    #[error("supplier {supplier} declares {capability} but does not implement it")]
    MissingFacet {
        supplier: String,
        capability: SupplierCapability,
    },

    #[error("failed to construct supplier {supplier}: {source}")]
    Construction {
        supplier: String,
        #[source]
        source: SupplierError,
    },
}

/// Internal failures of the order-import pipeline, reported through
/// [`partsbin_core::ImportResult::error_message`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is empty")]
    Empty,

    #[error("could not parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("no header row found in the first {scanned} rows")]
    HeaderNotFound { scanned: usize },

    #[error("required column missing: {0}")]
    MissingColumn(String),
}
