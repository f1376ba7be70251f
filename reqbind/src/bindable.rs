use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    config::DecodeOptions,
    decoder::decode_with,
    errors::{BindError, ConvertError},
    request::Request,
    setter::{DATE_FORMAT, DateSetter, DateTimeSetter, UuidSetter},
    types::{FieldDescriptor, ScalarKind, TargetType},
    value::{File, Value},
};

/// A Rust type that knows its field descriptor and how to rebuild itself from
/// a bound [`Value`].
///
/// Implemented for common std types; structs get it from `#[derive(Bind)]`.
pub trait Bindable: Sized {
    fn target_type() -> TargetType;

    /// Descriptor for a field of this type called `name`.
    fn descriptor(name: &str) -> FieldDescriptor {
        FieldDescriptor::scalar(name, Self::target_type())
    }

    fn from_value(value: Value) -> Result<Self, ConvertError>;
}

/// Binds a request into `T` with default options.
pub fn bind<T: Bindable>(request: &Request) -> Result<T, BindError> {
    bind_with(request, &DecodeOptions::default())
}

pub fn bind_with<T: Bindable>(request: &Request, options: &DecodeOptions) -> Result<T, BindError> {
    let descriptor = T::descriptor("");
    let value = decode_with(&descriptor, request, options).into_result()?;
    T::from_value(value).map_err(|err| BindError::Message(err.to_string()))
}

fn mismatch<T>(expected: &str, found: &Value) -> Result<T, ConvertError> {
    Err(ConvertError::new(expected, found.kind()))
}

impl Bindable for String {
    fn target_type() -> TargetType {
        TargetType::text()
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Text(text) => Ok(text),
            other => mismatch("string", &other),
        }
    }
}

impl Bindable for bool {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Bool)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Bool(flag) => Ok(flag),
            other => mismatch("bool", &other),
        }
    }
}

impl Bindable for char {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Char)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        let mut chars = value.as_str().unwrap_or_default().chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ch),
            _ => mismatch("char", &value),
        }
    }
}

macro_rules! bindable_integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Bindable for $ty {
                fn target_type() -> TargetType {
                    TargetType::Scalar(ScalarKind::$kind)
                }

                fn from_value(value: Value) -> Result<Self, ConvertError> {
                    let converted = match &value {
                        Value::Int(number) => <$ty>::try_from(*number).ok(),
                        Value::UInt(number) => <$ty>::try_from(*number).ok(),
                        _ => None,
                    };
                    converted.ok_or_else(|| ConvertError::new(stringify!($ty), value.kind()))
                }
            }
        )*
    };
}

bindable_integer!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

impl Bindable for f64 {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::F64)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value.as_f64().ok_or_else(|| ConvertError::new("f64", value.kind()))
    }
}

impl Bindable for f32 {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::F32)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_f64()
            .map(|number| number as f32)
            .ok_or_else(|| ConvertError::new("f32", value.kind()))
    }
}

impl Bindable for File {
    fn target_type() -> TargetType {
        TargetType::File
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::File(file) => Ok(file),
            other => mismatch("file", &other),
        }
    }
}

impl<T: Bindable> Bindable for Vec<T> {
    fn target_type() -> TargetType {
        TargetType::list_of(T::target_type())
    }

    fn descriptor(name: &str) -> FieldDescriptor {
        FieldDescriptor::list(name, T::descriptor(""))
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Files(files) => files.into_iter().map(|file| T::from_value(Value::File(file))).collect(),
            other => mismatch("list", &other),
        }
    }
}

impl<T: Bindable> Bindable for Option<T> {
    fn target_type() -> TargetType {
        TargetType::optional(T::target_type())
    }

    fn descriptor(name: &str) -> FieldDescriptor {
        let mut descriptor = T::descriptor(name).optional();
        descriptor.target = TargetType::optional(descriptor.target);
        descriptor
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Bindable> Bindable for Box<T> {
    fn target_type() -> TargetType {
        match T::target_type() {
            TargetType::Object { name, .. } => TargetType::Object { name, boxed: true },
            other => other,
        }
    }

    fn descriptor(name: &str) -> FieldDescriptor {
        T::descriptor(name).boxed()
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        T::from_value(value).map(Box::new)
    }
}

impl Bindable for Uuid {
    fn target_type() -> TargetType {
        TargetType::custom(UuidSetter)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_str()
            .and_then(|text| Uuid::parse_str(text).ok())
            .ok_or_else(|| ConvertError::new("uuid", value.kind()))
    }
}

impl Bindable for DateTime<Utc> {
    fn target_type() -> TargetType {
        TargetType::custom(DateTimeSetter)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
            .ok_or_else(|| ConvertError::new("datetime", value.kind()))
    }
}

impl Bindable for NaiveDate {
    fn target_type() -> TargetType {
        TargetType::custom(DateSetter)
    }

    fn from_value(value: Value) -> Result<Self, ConvertError> {
        value
            .as_str()
            .and_then(|text| NaiveDate::parse_from_str(text, DATE_FORMAT).ok())
            .ok_or_else(|| ConvertError::new("date", value.kind()))
    }
}

/// Pulls typed fields out of a bound object. Used by `#[derive(Bind)]`.
#[derive(Debug)]
pub struct ObjectEntries {
    entries: Vec<(String, Value)>,
}

impl ObjectEntries {
    pub fn new(value: Value, type_name: &str) -> Result<Self, ConvertError> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => mismatch(type_name, &other),
        }
    }

    /// Removes the entry named `name` and converts it. Entries that were never
    /// bound convert from `Value::Null`.
    pub fn take<T: Bindable>(&mut self, name: &str) -> Result<T, ConvertError> {
        let value = match self.entries.iter().position(|(key, _)| key == name) {
            Some(index) => self.entries.swap_remove(index).1,
            None => Value::Null,
        };
        T::from_value(value)
    }
}
