//! Conversion of located request data into typed values.
//!
//! Builtin targets are handled by [`TargetType::set`]; anything else plugs in
//! through a [`TypedValueSetter`] wrapped in [`TargetType::Custom`].

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{
    types::{ScalarKind, TargetType},
    value::{File, Value},
};

/// Raw material handed to a setter.
#[derive(Debug, Clone)]
pub enum RawInput<'a> {
    /// Text from a form field, query string, path segment, header or credentials.
    Text(&'a str),
    /// A value from a structured body.
    Json(&'a JsonValue),
    /// Uploaded files.
    Files(&'a [File]),
    /// A value that was already bound, being assigned into its slot.
    Bound(Value),
}

impl RawInput<'_> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawInput::Text(text) => Some(*text),
            RawInput::Json(JsonValue::String(text)) => Some(text.as_str()),
            RawInput::Bound(Value::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Text, or a JSON/bound number or bool rendered as text.
    fn render_text(&self) -> Option<String> {
        match self {
            RawInput::Json(JsonValue::Number(number)) => Some(number.to_string()),
            RawInput::Json(JsonValue::Bool(flag)) => Some(flag.to_string()),
            RawInput::Bound(Value::Int(number)) => Some(number.to_string()),
            RawInput::Bound(Value::UInt(number)) => Some(number.to_string()),
            RawInput::Bound(Value::Float(number)) => Some(number.to_string()),
            RawInput::Bound(Value::Bool(flag)) => Some(flag.to_string()),
            other => other.as_text().map(str::to_string),
        }
    }

    fn as_signed(&self) -> Option<i64> {
        match self {
            RawInput::Json(JsonValue::Number(number)) => number.as_i64(),
            RawInput::Bound(value) => value.as_i64(),
            other => other.as_text().and_then(|text| text.parse::<i64>().ok()),
        }
    }

    fn as_unsigned(&self) -> Option<u64> {
        match self {
            RawInput::Json(JsonValue::Number(number)) => number.as_u64(),
            RawInput::Bound(value) => value.as_u64(),
            other => other.as_text().and_then(|text| text.parse::<u64>().ok()),
        }
    }

    fn as_float(&self) -> Option<f64> {
        let value = match self {
            RawInput::Json(JsonValue::Number(number)) => number.as_f64(),
            RawInput::Bound(value) => value.as_f64(),
            other => other.as_text().and_then(|text| text.parse::<f64>().ok()),
        }?;
        value.is_finite().then_some(value)
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            RawInput::Json(JsonValue::Bool(flag)) => Some(*flag),
            RawInput::Bound(Value::Bool(flag)) => Some(*flag),
            other => other.as_text().and_then(parse_bool),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Converts raw request data into values of one target type.
///
/// `set` returns `None` when the input is not compatible with the type; the
/// decoder reports that as an invalid-type error for the field.
pub trait TypedValueSetter: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Value of an optional field that was not supplied.
    fn zero(&self) -> Value;

    fn set(&self, raw: RawInput<'_>) -> Option<Value>;
}

impl TargetType {
    pub fn set(&self, raw: RawInput<'_>) -> Option<Value> {
        match self {
            TargetType::Optional(inner) => match raw {
                RawInput::Bound(Value::Null) | RawInput::Json(JsonValue::Null) => Some(Value::Null),
                raw => inner.set(raw),
            },
            TargetType::Scalar(kind) => set_scalar(*kind, &raw),
            TargetType::File => match raw {
                RawInput::Bound(file @ Value::File(_)) => Some(file),
                _ => None,
            },
            TargetType::List(element) if matches!(element.base(), TargetType::File) => match raw {
                RawInput::Files(files) => Some(Value::Files(files.to_vec())),
                RawInput::Bound(files @ Value::Files(_)) => Some(files),
                _ => None,
            },
            TargetType::List(element) => match raw {
                RawInput::Bound(Value::List(items)) => items
                    .into_iter()
                    .map(|item| element.set(RawInput::Bound(item)))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List),
                RawInput::Json(JsonValue::Array(items)) => items
                    .iter()
                    .map(|item| element.set(RawInput::Json(item)))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List),
                _ => None,
            },
            TargetType::Object { .. } => match raw {
                RawInput::Bound(object @ Value::Object(_)) => Some(object),
                _ => None,
            },
            TargetType::Custom(setter) => setter.set(raw),
        }
    }
}

fn set_scalar(kind: ScalarKind, raw: &RawInput<'_>) -> Option<Value> {
    match kind {
        ScalarKind::Text => raw.render_text().map(Value::Text),
        ScalarKind::Char => {
            let mut chars = raw.as_text()?.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Some(Value::Text(ch.to_string())),
                _ => None,
            }
        }
        ScalarKind::Bool => raw.as_bool().map(Value::Bool),
        ScalarKind::F32 => raw
            .as_float()
            .filter(|value| value.abs() <= f64::from(f32::MAX))
            .map(Value::Float),
        ScalarKind::F64 => raw.as_float().map(Value::Float),
        integer => {
            if let Some((min, max)) = integer.signed_bounds() {
                raw.as_signed()
                    .filter(|value| (min..=max).contains(value))
                    .map(Value::Int)
            } else {
                let max = integer.unsigned_max()?;
                raw.as_unsigned().filter(|value| *value <= max).map(Value::UInt)
            }
        }
    }
}

/// Accepts any textual UUID and stores it hyphenated and lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSetter;

impl TypedValueSetter for UuidSetter {
    fn type_name(&self) -> &str {
        "uuid"
    }

    fn zero(&self) -> Value {
        Value::Text(Uuid::nil().to_string())
    }

    fn set(&self, raw: RawInput<'_>) -> Option<Value> {
        let parsed = Uuid::parse_str(raw.as_text()?.trim()).ok()?;
        Some(Value::Text(parsed.hyphenated().to_string()))
    }
}

/// RFC 3339 timestamps, normalized to UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeSetter;

impl TypedValueSetter for DateTimeSetter {
    fn type_name(&self) -> &str {
        "datetime"
    }

    fn zero(&self) -> Value {
        Value::Text("1970-01-01T00:00:00Z".to_string())
    }

    fn set(&self, raw: RawInput<'_>) -> Option<Value> {
        let parsed = DateTime::parse_from_rfc3339(raw.as_text()?.trim()).ok()?;
        Some(Value::Text(
            parsed.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))
    }
}

/// Calendar dates written as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateSetter;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

impl TypedValueSetter for DateSetter {
    fn type_name(&self) -> &str {
        "date"
    }

    fn zero(&self) -> Value {
        Value::Text("1970-01-01".to_string())
    }

    fn set(&self, raw: RawInput<'_>) -> Option<Value> {
        let parsed = NaiveDate::parse_from_str(raw.as_text()?.trim(), DATE_FORMAT).ok()?;
        Some(Value::Text(parsed.format(DATE_FORMAT).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scalar(kind: ScalarKind) -> TargetType {
        TargetType::Scalar(kind)
    }

    #[test]
    fn integers_respect_their_width() {
        assert_eq!(scalar(ScalarKind::U8).set(RawInput::Text("255")), Some(Value::UInt(255)));
        assert_eq!(scalar(ScalarKind::U8).set(RawInput::Text("256")), None);
        assert_eq!(scalar(ScalarKind::I8).set(RawInput::Text("-128")), Some(Value::Int(-128)));
        assert_eq!(scalar(ScalarKind::U32).set(RawInput::Text("-1")), None);
        assert_eq!(scalar(ScalarKind::I64).set(RawInput::Json(&json!(42))), Some(Value::Int(42)));
        assert_eq!(scalar(ScalarKind::I64).set(RawInput::Text("4.2")), None);
    }

    #[test]
    fn booleans_accept_form_spellings() {
        let target = scalar(ScalarKind::Bool);
        assert_eq!(target.set(RawInput::Text("on")), Some(Value::Bool(true)));
        assert_eq!(target.set(RawInput::Text("No")), Some(Value::Bool(false)));
        assert_eq!(target.set(RawInput::Json(&json!(true))), Some(Value::Bool(true)));
        assert_eq!(target.set(RawInput::Text("maybe")), None);
    }

    #[test]
    fn floats_reject_non_finite_values() {
        assert_eq!(scalar(ScalarKind::F64).set(RawInput::Text("2.5")), Some(Value::Float(2.5)));
        assert_eq!(scalar(ScalarKind::F64).set(RawInput::Text("NaN")), None);
        assert_eq!(scalar(ScalarKind::F32).set(RawInput::Text("1e300")), None);
    }

    #[test]
    fn text_renders_numbers_and_bools() {
        let target = scalar(ScalarKind::Text);
        assert_eq!(target.set(RawInput::Json(&json!(12345))), Some(Value::Text("12345".into())));
        assert_eq!(target.set(RawInput::Json(&json!(2.5))), Some(Value::Text("2.5".into())));
        assert_eq!(target.set(RawInput::Json(&json!(true))), Some(Value::Text("true".into())));
        assert_eq!(target.set(RawInput::Bound(Value::UInt(7))), Some(Value::Text("7".into())));
        assert_eq!(target.set(RawInput::Json(&json!(null))), None);
        assert_eq!(target.set(RawInput::Json(&json!(["a"]))), None);
        assert_eq!(scalar(ScalarKind::Char).set(RawInput::Json(&json!(3))), None);
        assert_eq!(
            scalar(ScalarKind::Text).set(RawInput::Json(&json!("three"))),
            Some(Value::Text("three".into()))
        );
    }

    #[test]
    fn optional_targets_accept_null() {
        let target = TargetType::optional(scalar(ScalarKind::I32));
        assert_eq!(target.set(RawInput::Json(&JsonValue::Null)), Some(Value::Null));
        assert_eq!(target.set(RawInput::Text("7")), Some(Value::Int(7)));
    }

    #[test]
    fn lists_convert_every_element() {
        let target = TargetType::list_of(scalar(ScalarKind::U16));
        assert_eq!(
            target.set(RawInput::Json(&json!([1, 2]))),
            Some(Value::List(vec![Value::UInt(1), Value::UInt(2)]))
        );
        assert_eq!(target.set(RawInput::Json(&json!([1, "x"]))), None);
    }

    #[test]
    fn file_targets_only_take_files() {
        let files = [File::new("a.txt")];
        assert_eq!(
            TargetType::list_of(TargetType::File).set(RawInput::Files(&files)),
            Some(Value::Files(files.to_vec()))
        );
        assert_eq!(TargetType::File.set(RawInput::Text("a.txt")), None);
    }

    #[test]
    fn builtin_custom_setters_normalize() {
        assert_eq!(
            UuidSetter.set(RawInput::Text("550E8400-E29B-41D4-A716-446655440000")),
            Some(Value::Text("550e8400-e29b-41d4-a716-446655440000".into()))
        );
        assert_eq!(
            DateTimeSetter.set(RawInput::Text("2024-05-01T12:00:00+02:00")),
            Some(Value::Text("2024-05-01T10:00:00Z".into()))
        );
        assert_eq!(DateSetter.set(RawInput::Text("2024-02-30")), None);
        assert_eq!(DateSetter.set(RawInput::Text("2024-02-29")), Some(Value::Text("2024-02-29".into())));
    }
}
