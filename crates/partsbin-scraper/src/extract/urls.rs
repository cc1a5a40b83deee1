use partsbin_core::ExtractionResult;
use serde_json::Value;

use super::{Coerce, DataExtractor};
use crate::origin::resolve_url;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
pub const DATASHEET_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx"];

impl DataExtractor {
    /// Returns the first candidate that resolves to an absolute URL.
    ///
    /// Values are trimmed, resolved against `base_url` when relative, and must
    /// carry a scheme and host. With `required_extensions`, the URL path must
    /// end in one of them (case-insensitive); query strings are ignored.
    #[must_use]
    pub fn extract_url(
        &self,
        data: &Value,
        candidate_paths: &[&str],
        base_url: Option<&str>,
        required_extensions: Option<&[&str]>,
    ) -> ExtractionResult<String> {
        let mut warnings = Vec::new();

        for path in candidate_paths {
            let Some(raw) = self.safe_get(data, path).and_then(String::coerce) else {
                warnings.push(format!("url path '{path}': no data"));
                continue;
            };

            let url = match resolve_url(&raw, base_url) {
                Ok(url) => url,
                Err(reason) => {
                    warnings.push(format!("url path '{path}': {reason}"));
                    continue;
                }
            };

            if let Some(extensions) = required_extensions {
                let url_path = url.path().to_ascii_lowercase();
                if !extensions
                    .iter()
                    .any(|ext| url_path.ends_with(&ext.to_ascii_lowercase()))
                {
                    warnings.push(format!(
                        "url path '{path}': '{url}' does not end in one of {}",
                        extensions.join(", ")
                    ));
                    continue;
                }
            }

            return ExtractionResult::ok(url.to_string()).with_warnings(warnings);
        }

        tracing::debug!(supplier = %self.supplier, ?candidate_paths, "no usable URL found");
        ExtractionResult::failed("no valid URL found").with_warnings(warnings)
    }

    #[must_use]
    pub fn extract_image_url(
        &self,
        data: &Value,
        candidate_paths: &[&str],
        base_url: Option<&str>,
    ) -> ExtractionResult<String> {
        self.extract_url(data, candidate_paths, base_url, Some(IMAGE_EXTENSIONS))
    }

    #[must_use]
    pub fn extract_datasheet_url(
        &self,
        data: &Value,
        candidate_paths: &[&str],
        base_url: Option<&str>,
    ) -> ExtractionResult<String> {
        self.extract_url(data, candidate_paths, base_url, Some(DATASHEET_EXTENSIONS))
    }
}
