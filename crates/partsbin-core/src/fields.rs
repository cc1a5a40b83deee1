//! Credential and configuration schema definitions.
//!
//! A schema is a list of [`FieldDefinition`]s. Front ends use it to render a
//! dynamic form; adapters use [`validate_fields`] to check supplied values
//! before their first outbound call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Password,
    Url,
    Select,
    Boolean,
    Textarea,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// One entry of a credential or configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

impl FieldDefinition {
    #[must_use]
    pub fn new(name: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_owned(),
            label: label.to_owned(),
            field_type,
            required: false,
            default_value: None,
            description: None,
            help_text: None,
            options: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_owned());
        self
    }

    #[must_use]
    pub fn help_text(mut self, text: &str) -> Self {
        self.help_text = Some(text.to_owned());
        self
    }

    /// Sets the option list; each `(value, label)` pair becomes one option.
    #[must_use]
    pub fn options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = Some(
            options
                .iter()
                .map(|(value, label)| FieldOption {
                    value: (*value).to_owned(),
                    label: (*label).to_owned(),
                })
                .collect(),
        );
        self
    }
}

/// A single problem found while validating supplied values against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Parses the truthy/falsy spellings accepted for boolean fields.
#[must_use]
pub fn parse_bool_literal(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Some(true),
        "false" | "0" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Validates `values` against `schema`, applying schema defaults for absent fields.
///
/// Returns the effective values (supplied values plus defaults) when every
/// field is valid. Values for names not present in the schema are passed
/// through untouched.
///
/// # Errors
///
/// Returns every [`FieldIssue`] found, not just the first.
pub fn validate_fields(
    schema: &[FieldDefinition],
    values: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, Vec<FieldIssue>> {
    let mut effective = values.clone();
    let mut issues = Vec::new();

    for field in schema {
        let supplied = values.get(&field.name).filter(|v| !is_blank(v));

        let Some(value) = supplied else {
            if let Some(default) = &field.default_value {
                effective.insert(field.name.clone(), default.clone());
            } else if field.required {
                issues.push(FieldIssue {
                    field: field.name.clone(),
                    message: format!("{} is required", field.label),
                });
            }
            continue;
        };

        if let Some(message) = check_value(field, value) {
            issues.push(FieldIssue {
                field: field.name.clone(),
                message,
            });
        }
    }

    if issues.is_empty() {
        Ok(effective)
    } else {
        Err(issues)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_value(field: &FieldDefinition, value: &Value) -> Option<String> {
    match field.field_type {
        FieldType::Url => {
            let raw = value.as_str()?;
            let has_scheme = raw.starts_with("http://") || raw.starts_with("https://");
            let has_host = raw
                .split_once("://")
                .is_some_and(|(_, rest)| !rest.trim_start_matches('/').is_empty());
            (!(has_scheme && has_host)).then(|| format!("'{raw}' is not an http(s) URL"))
        }
        FieldType::Boolean => match value {
            Value::Bool(_) => None,
            Value::String(s) if parse_bool_literal(s).is_some() => None,
            other => Some(format!("'{other}' is not a boolean")),
        },
        FieldType::Select => {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let options = field.options.as_deref().unwrap_or_default();
            (!options.iter().any(|o| o.value == raw))
                .then(|| format!("'{raw}' is not one of the allowed options"))
        }
        FieldType::Text | FieldType::Password | FieldType::Textarea => None,
    }
}
