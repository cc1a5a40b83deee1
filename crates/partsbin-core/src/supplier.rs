use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static identity of a supplier adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierInfo {
    /// Registry key, lower-case (e.g. `"lcsc"`).
    pub name: String,
    /// Human-facing name (e.g. `"LCSC Electronics"`).
    pub display_name: String,
    pub description: String,
    pub website_url: String,
    pub api_documentation_url: Option<String>,
    pub supports_oauth: bool,
    /// Free-form description of the remote rate limit (e.g. `"30 requests/minute"`).
    pub rate_limit_info: Option<String>,
    /// Order-file extensions this adapter can import, lower-case with dot.
    #[serde(default)]
    pub supported_file_types: Vec<String>,
}

/// Outcome of a lightweight health-check round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Map<String, Value>,
}

impl ConnectionTestResult {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_owned(), value.into());
        self
    }
}
