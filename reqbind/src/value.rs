use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

/// Handle to one uploaded file.
///
/// Binding never reads the file contents; it only cares whether a file was
/// uploaded under a given name and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl File {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            size: 0,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}

/// A value produced by binding.
///
/// Objects keep their entries in the declared field order of the descriptor
/// they were bound from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    File(File),
    Files(Vec<File>),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(value) => Some(*value),
            Value::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            Value::UInt(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Value::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&[File]> {
        match self {
            Value::Files(files) => Some(files),
            _ => None,
        }
    }

    /// Looks up an object entry by field name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.iter().find(|(key, _)| key == name).map(|(_, value)| value),
            _ => None,
        }
    }

    /// Replaces the entry named `name` in an object value. Returns `false` when
    /// `self` is not an object or has no such entry.
    pub(crate) fn set_entry(&mut self, name: &str, value: Value) -> bool {
        match self {
            Value::Object(entries) => match entries.iter_mut().find(|(key, _)| key == name) {
                Some((_, slot)) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Number of characters for text, number of elements for lists and file lists.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(text) => Some(text.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Files(files) => Some(files.len()),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::File(_) => "file",
            Value::Files(_) => "files",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<File> for Value {
    fn from(value: File) -> Self {
        Value::File(value)
    }
}

// Files serialize as their metadata so bound values can be printed as JSON.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::UInt(value) => serializer.serialize_u64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Text(value) => serializer.serialize_str(value),
            Value::File(file) => file.serialize(serializer),
            Value::Files(files) => files.serialize(serializer),
            Value::List(items) => items.serialize(serializer),
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_lookup_and_replace() {
        let mut value = Value::Object(vec![("name".into(), Value::Null), ("age".into(), Value::Int(0))]);
        assert!(value.set_entry("age", Value::Int(41)));
        assert!(!value.set_entry("missing", Value::Null));
        assert_eq!(value.get("age"), Some(&Value::Int(41)));
        assert_eq!(value.get("name"), Some(&Value::Null));
    }

    #[test]
    fn serializes_objects_in_declared_order() {
        let value = Value::Object(vec![
            ("z".into(), Value::Int(1)),
            ("a".into(), Value::File(File::new("cv.pdf"))),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"z":1,"a":{"filename":"cv.pdf","size":0}}"#);
    }
}
