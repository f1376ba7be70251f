//! Field trees and requests described in TOML or JSON files.
//!
//! Lets a field tree be defined without a Rust type behind it, e.g. for the
//! `reqbind` CLI or for services that load binding rules at startup.

use std::{collections::BTreeMap, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    errors::SchemaError,
    request::Request,
    setter::{DateSetter, DateTimeSetter, UuidSetter},
    types::{FieldDescriptor, ScalarKind, Source, TargetType, ValidationRule},
    value::File,
};

/// One node of a field tree as written in a schema file.
///
/// ```toml
/// type = "object"
/// title = "Signup"
///
/// [[fields]]
/// name = "email"
/// type = "string"
/// rules = [{ rule = "email" }]
///
/// [[fields]]
/// name = "page"
/// type = "u32"
/// source = "query"
/// required = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Type name reported in errors for objects.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Bind an absent optional field to null instead of its zero value.
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(default)]
    pub items: Option<Box<SchemaField>>,
    #[serde(default)]
    pub rules: Vec<SchemaRule>,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case", deny_unknown_fields)]
pub enum SchemaRule {
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    Regex {
        pattern: String,
    },
    OneOf {
        allowed: Vec<String>,
        #[serde(default)]
        case_insensitive: bool,
    },
    Email,
    Url,
    Uuid,
}

impl SchemaField {
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reads a schema file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = read(path)?;
        if is_json(path) {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn to_descriptor(&self) -> Result<FieldDescriptor, SchemaError> {
        FieldDescriptor::try_from(self)
    }

    fn label(&self) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else if !self.real_name.is_empty() {
            self.real_name.clone()
        } else {
            "<root>".to_string()
        }
    }

    fn invalid(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::InvalidField {
            field: self.label(),
            message: message.into(),
        }
    }
}

impl TryFrom<&SchemaField> for FieldDescriptor {
    type Error = SchemaError;

    fn try_from(schema: &SchemaField) -> Result<Self, Self::Error> {
        let type_name = schema.type_name.trim().to_ascii_lowercase();
        if type_name != "object" && !schema.fields.is_empty() {
            return Err(schema.invalid("only object fields may declare `fields`"));
        }
        if type_name != "list" && schema.items.is_some() {
            return Err(schema.invalid("only list fields may declare `items`"));
        }

        let mut descriptor = match type_name.as_str() {
            "object" => {
                let children = schema
                    .fields
                    .iter()
                    .map(FieldDescriptor::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                let title = schema.title.clone().unwrap_or_else(|| schema.label());
                FieldDescriptor::object(schema.name.as_str(), title, children)
            }
            "list" => {
                let items = schema
                    .items
                    .as_deref()
                    .ok_or_else(|| schema.invalid("list fields need an `items` definition"))?;
                FieldDescriptor::list(schema.name.as_str(), FieldDescriptor::try_from(items)?)
            }
            "file" => FieldDescriptor::file(schema.name.as_str()),
            "files" => FieldDescriptor::files(schema.name.as_str()),
            "uuid" => FieldDescriptor::scalar(schema.name.as_str(), TargetType::custom(UuidSetter)),
            "datetime" => FieldDescriptor::scalar(schema.name.as_str(), TargetType::custom(DateTimeSetter)),
            "date" => FieldDescriptor::scalar(schema.name.as_str(), TargetType::custom(DateSetter)),
            other => match ScalarKind::from_name(other) {
                Some(kind) => FieldDescriptor::scalar(schema.name.as_str(), TargetType::Scalar(kind)),
                None => {
                    return Err(SchemaError::UnknownType {
                        field: schema.label(),
                        type_name: schema.type_name.clone(),
                    });
                }
            },
        };

        descriptor.real_name = schema.real_name.clone();
        descriptor.required = schema.required;
        if schema.nullable {
            descriptor.target = TargetType::optional(descriptor.target);
        }
        if let Some(tag) = &schema.source {
            descriptor.source = tag.parse::<Source>()?;
        }
        for rule in &schema.rules {
            descriptor.validations.push(convert_rule(schema, rule)?);
        }
        Ok(descriptor)
    }
}

fn convert_rule(schema: &SchemaField, rule: &SchemaRule) -> Result<ValidationRule, SchemaError> {
    Ok(match rule {
        SchemaRule::Length { min, max } => {
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(schema.invalid(format!("length min {min} exceeds max {max}")));
            }
            ValidationRule::Length { min: *min, max: *max }
        }
        SchemaRule::Range { min, max } => ValidationRule::Range { min: *min, max: *max },
        SchemaRule::Regex { pattern } => {
            Regex::new(pattern).map_err(|source| SchemaError::InvalidRegex {
                field: schema.label(),
                pattern: pattern.clone(),
                source,
            })?;
            ValidationRule::Regex {
                pattern: pattern.clone(),
            }
        }
        SchemaRule::OneOf {
            allowed,
            case_insensitive,
        } => ValidationRule::OneOf {
            allowed: allowed.clone(),
            case_insensitive: *case_insensitive,
        },
        SchemaRule::Email => ValidationRule::Email,
        SchemaRule::Url => ValidationRule::Url,
        SchemaRule::Uuid => ValidationRule::Uuid,
    })
}

/// A query parameter written either as one string or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValues {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCredentials {
    pub username: String,
    pub password: String,
}

/// A request written down as JSON (or TOML), for tests and the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestFixture {
    pub form: Map<String, JsonValue>,
    pub query: BTreeMap<String, QueryValues>,
    pub path: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub files: BTreeMap<String, Vec<File>>,
    pub basic_auth: Option<FixtureCredentials>,
}

impl RequestFixture {
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = read(path)?;
        if is_json(path) {
            Self::from_json_str(&content)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn into_request(self) -> Request {
        let mut builder = Request::builder().json_body(JsonValue::Object(self.form));
        for (name, values) in self.query {
            match values {
                QueryValues::One(value) => builder = builder.query(name, value),
                QueryValues::Many(values) => {
                    for value in values {
                        builder = builder.query(name.clone(), value);
                    }
                }
            }
        }
        for (name, value) in self.path {
            builder = builder.path(name, value);
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        for (name, files) in self.files {
            builder = builder.empty_files(name.clone());
            for file in files {
                builder = builder.file(name.clone(), file);
            }
        }
        if let Some(credentials) = self.basic_auth {
            builder = builder.basic_auth(credentials.username, credentials.password);
        }
        builder.build()
    }
}

fn read(path: &Path) -> Result<String, SchemaError> {
    std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}
