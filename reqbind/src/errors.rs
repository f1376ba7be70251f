use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

use crate::types::FieldDescriptor;

const MISSING_MESSAGE: &str = "field is required";

/// A binding failure, shaped like the field tree it came from.
///
/// `Display` renders the error as compact JSON: a message string, a list, or a
/// single-key object mapping a field name to a nested error.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// A required field had no data in the request.
    Missing { field: String },
    /// Located data could not be converted to the field's target type.
    InvalidType { field: String, expected: String },
    /// The converted value broke one of the field's validation rules.
    Invalid { field: String, rule: String, message: String },
    Message(String),
    List(Vec<BindError>),
    Nested { name: String, error: Box<BindError> },
}

impl BindError {
    pub fn missing(field: &FieldDescriptor) -> Self {
        BindError::Missing {
            field: field.entry_name().to_string(),
        }
    }

    pub fn invalid_type(field: &FieldDescriptor) -> Self {
        BindError::InvalidType {
            field: field.entry_name().to_string(),
            expected: field.target.name(),
        }
    }

    pub fn invalid(field: &FieldDescriptor, rule: impl Into<String>, message: impl Into<String>) -> Self {
        BindError::Invalid {
            field: field.entry_name().to_string(),
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn nested(name: impl Into<String>, error: BindError) -> Self {
        BindError::Nested {
            name: name.into(),
            error: Box::new(error),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, BindError::Missing { .. })
    }

    pub fn is_invalid_type(&self) -> bool {
        matches!(self, BindError::InvalidType { .. })
    }

    /// The error report as a JSON value.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::String(self.leaf_message()))
    }

    fn leaf_message(&self) -> String {
        match self {
            BindError::Missing { .. } => MISSING_MESSAGE.to_string(),
            BindError::InvalidType { expected, .. } => format!("invalid type, expected {expected}"),
            BindError::Invalid { message, .. } => message.clone(),
            BindError::Message(message) => message.clone(),
            BindError::List(_) | BindError::Nested { .. } => String::new(),
        }
    }

    /// Flattens the tree into one issue per leaf, with dotted field paths.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.collect_issues("", &mut issues);
        issues
    }

    fn collect_issues(&self, prefix: &str, issues: &mut Vec<ValidationIssue>) {
        let join = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else if name.is_empty() {
                prefix.to_string()
            } else {
                format!("{prefix}.{name}")
            }
        };
        match self {
            BindError::Missing { field } => {
                issues.push(ValidationIssue::new(join(field), "bind.required", self.leaf_message()));
            }
            BindError::InvalidType { field, .. } => {
                issues.push(ValidationIssue::new(join(field), "bind.invalid_type", self.leaf_message()));
            }
            BindError::Invalid { field, rule, message } => {
                issues.push(ValidationIssue::new(join(field), format!("bind.{rule}"), message.clone()));
            }
            BindError::Message(message) => {
                issues.push(ValidationIssue::new(prefix, "bind.error", message.clone()));
            }
            BindError::List(errors) => {
                for error in errors {
                    error.collect_issues(prefix, issues);
                }
            }
            BindError::Nested { name, error } => error.collect_issues(&join(name), issues),
        }
    }
}

impl Serialize for BindError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BindError::Missing { field } | BindError::InvalidType { field, .. } | BindError::Invalid { field, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(field, &self.leaf_message())?;
                map.end()
            }
            BindError::Message(message) => serializer.serialize_str(message),
            BindError::List(errors) => errors.serialize(serializer),
            BindError::Nested { name, error } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, error)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl std::error::Error for BindError {}

/// Combines field errors into one.
///
/// No errors yields `None`, a single error passes through untouched, and
/// several are kept in order as a [`BindError::List`]. Nothing is merged or
/// deduplicated.
pub fn aggregate<I>(errors: I) -> Option<BindError>
where
    I: IntoIterator<Item = BindError>,
{
    let mut errors: Vec<BindError> = errors.into_iter().collect();
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        _ => Some(BindError::List(errors)),
    }
}

/// Flat record of one binding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A bound value could not be turned into the requested Rust type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert {found} into {expected}")]
pub struct ConvertError {
    pub expected: String,
    pub found: String,
}

impl ConvertError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Invalid field tree definitions.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown source tag `{tag}` (expected one of body, path, subdomain, query, headers, files, auth)")]
    UnknownSource { tag: String },

    #[error("unknown field type `{type_name}` on `{field}`")]
    UnknownType { field: String, type_name: String },

    #[error("field `{field}`: {message}")]
    InvalidField { field: String, message: String },

    #[error("invalid regex `{pattern}` on `{field}`: {source}")]
    InvalidRegex {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid decode options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value `{value}` for {key}")]
    InvalidEnv { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> BindError {
        BindError::Message(text.to_string())
    }

    #[test]
    fn aggregate_of_nothing_is_none() {
        assert_eq!(aggregate(Vec::new()), None);
    }

    #[test]
    fn aggregate_passes_single_error_through() {
        let error = aggregate([leaf("a")]).unwrap();
        assert_eq!(error, leaf("a"));
        assert_eq!(error.to_string(), r#""a""#);
    }

    #[test]
    fn aggregate_joins_many_in_order() {
        let error = aggregate([leaf("a"), leaf("b"), leaf("a")]).unwrap();
        assert_eq!(error.to_string(), r#"["a","b","a"]"#);
    }

    #[test]
    fn field_errors_render_keyed_by_field() {
        let missing = BindError::Missing { field: "zip".into() };
        assert_eq!(missing.to_string(), r#"{"zip":"field is required"}"#);

        let invalid = BindError::InvalidType {
            field: "age".into(),
            expected: "u8".into(),
        };
        assert_eq!(invalid.to_string(), r#"{"age":"invalid type, expected u8"}"#);

        let nested = BindError::nested("addr", missing);
        assert_eq!(nested.to_string(), r#"{"addr":{"zip":"field is required"}}"#);
    }

    #[test]
    fn issues_flatten_with_dotted_paths() {
        let error = BindError::List(vec![
            BindError::Missing { field: "email".into() },
            BindError::nested(
                "addr",
                BindError::List(vec![
                    BindError::Missing { field: "zip".into() },
                    BindError::Invalid {
                        field: "city".into(),
                        rule: "length".into(),
                        message: "length must be at least 2".into(),
                    },
                ]),
            ),
        ]);
        let issues = error.issues();
        assert_eq!(
            issues,
            vec![
                ValidationIssue::new("email", "bind.required", "field is required"),
                ValidationIssue::new("addr.zip", "bind.required", "field is required"),
                ValidationIssue::new("addr.city", "bind.length", "length must be at least 2"),
            ]
        );
    }
}
