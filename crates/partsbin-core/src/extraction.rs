use serde::{Deserialize, Serialize};

/// Envelope returned by every extraction and scrape operation.
///
/// Extraction never fails with an error type: a miss is reported as
/// `success == false` with an `error` message and whatever `warnings` were
/// collected along the way, so callers can continue with partial data.
/// `value` is only meaningful when `success` is `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult<T> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> ExtractionResult<T> {
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// The value, only when extraction succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        if self.success {
            self.value.as_ref()
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        if self.success {
            self.value
        } else {
            None
        }
    }

    /// Maps the carried value, keeping status and warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionResult<U> {
        ExtractionResult {
            success: self.success,
            value: self.value.map(f),
            error: self.error,
            warnings: self.warnings,
        }
    }
}
