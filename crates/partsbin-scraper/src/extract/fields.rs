use std::collections::BTreeMap;

use partsbin_core::ExtractionResult;
use serde::Serialize;
use serde_json::Value;

use super::DataExtractor;
use crate::text::{clean_text, normalize_key, strip_html, truncate_words};

/// The three identifiers of a part, each extracted independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartNumbers {
    pub supplier_part_number: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub manufacturer: Option<String>,
}

fn stringify(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(stringify)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

impl DataExtractor {
    /// Extracts named specifications, one value per name from its first non-null path.
    ///
    /// Keys are passed through [`normalize_key`] unless `normalize_keys` is
    /// false. Fails only when no specification resolves at all.
    #[must_use]
    pub fn extract_specifications(
        &self,
        data: &Value,
        spec_paths: &[(&str, &[&str])],
        normalize_keys: bool,
    ) -> ExtractionResult<BTreeMap<String, String>> {
        let mut specs = BTreeMap::new();
        let mut warnings = Vec::new();

        for (name, paths) in spec_paths {
            let found = paths
                .iter()
                .filter_map(|path| self.safe_get(data, path))
                .find_map(stringify);
            let Some(value) = found else {
                warnings.push(format!("specification '{name}': not found"));
                continue;
            };
            let key = if normalize_keys {
                normalize_key(name)
            } else {
                (*name).to_owned()
            };
            if key.is_empty() {
                warnings.push(format!("specification '{name}': key is empty after normalization"));
                continue;
            }
            specs.insert(key, value);
        }

        if specs.is_empty() {
            return ExtractionResult::failed("no specifications found").with_warnings(warnings);
        }
        ExtractionResult::ok(specs).with_warnings(warnings)
    }

    /// Normalizes a flat list of `{name, value}` attribute objects into a spec map.
    ///
    /// Common in supplier APIs (`ProductAttributes`, `Parameters`, `paramVOList`).
    #[must_use]
    pub fn extract_attribute_list(
        &self,
        data: &Value,
        list_path: &str,
        name_keys: &[&str],
        value_keys: &[&str],
    ) -> BTreeMap<String, String> {
        let Some(Value::Array(items)) = self.safe_get(data, list_path) else {
            return BTreeMap::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let name = name_keys
                    .iter()
                    .filter_map(|k| self.safe_get(item, k))
                    .find_map(stringify)?;
                let value = value_keys
                    .iter()
                    .filter_map(|k| self.safe_get(item, k))
                    .find_map(stringify)?;
                let key = normalize_key(&name);
                (!key.is_empty()).then_some((key, value))
            })
            .collect()
    }

    /// First candidate with non-blank text, optionally HTML-stripped and truncated.
    #[must_use]
    pub fn extract_clean_text(
        &self,
        data: &Value,
        candidate_paths: &[&str],
        max_length: Option<usize>,
        strip_html_tags: bool,
    ) -> ExtractionResult<String> {
        let mut warnings = Vec::new();

        for path in candidate_paths {
            let Some(raw) = self.safe_get(data, path).and_then(stringify) else {
                warnings.push(format!("text path '{path}': no data"));
                continue;
            };
            let text = if strip_html_tags {
                clean_text(&strip_html(&raw))
            } else {
                clean_text(&raw)
            };
            if text.is_empty() {
                warnings.push(format!("text path '{path}': blank after cleaning"));
                continue;
            }
            let text = match max_length {
                Some(max) => truncate_words(&text, max),
                None => text,
            };
            return ExtractionResult::ok(text).with_warnings(warnings);
        }

        ExtractionResult::failed("no text found").with_warnings(warnings)
    }

    /// Extracts supplier part number, manufacturer part number, and manufacturer.
    ///
    /// Each field is looked up on its own; partial results are kept. Fails
    /// only when none of the three is found.
    #[must_use]
    pub fn extract_part_numbers(
        &self,
        data: &Value,
        supplier_paths: &[&str],
        mfr_part_paths: &[&str],
        mfr_name_paths: Option<&[&str]>,
    ) -> ExtractionResult<PartNumbers> {
        let mut warnings = Vec::new();
        let mut take = |paths: &[&str], label: &str| {
            let result = self.extract_clean_text(data, paths, None, false);
            if !result.success {
                warnings.push(format!("{label} not found"));
            }
            result.into_value()
        };

        let numbers = PartNumbers {
            supplier_part_number: take(supplier_paths, "supplier part number"),
            manufacturer_part_number: take(mfr_part_paths, "manufacturer part number"),
            manufacturer: mfr_name_paths.and_then(|paths| take(paths, "manufacturer")),
        };

        if numbers == PartNumbers::default() {
            return ExtractionResult::failed("no part numbers found").with_warnings(warnings);
        }
        ExtractionResult::ok(numbers).with_warnings(warnings)
    }
}
