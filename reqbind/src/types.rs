use std::{fmt, str::FromStr, sync::Arc};

use crate::{errors::SchemaError, setter::TypedValueSetter, value::Value};

/// Describes one expected piece of request data.
///
/// Field trees are normally produced by `#[derive(Bind)]` or loaded from a
/// schema file, but can be assembled by hand with the builder methods.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub real_name: String,
    pub shape: Shape,
    pub target: TargetType,
    /// File data for this field is multi-valued.
    pub is_slice: bool,
    pub required: bool,
    pub source: Source,
    pub validations: Vec<ValidationRule>,
}

/// How a field is decoded.
#[derive(Debug, Clone)]
pub enum Shape {
    Scalar,
    /// A sequence; holds the descriptor of one element.
    List(Box<FieldDescriptor>),
    /// A nested object; children are kept in the declared field order of the target type.
    Object(Vec<FieldDescriptor>),
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Scalar => "scalar",
            Shape::List(_) => "list",
            Shape::Object(_) => "object",
        }
    }
}

/// Where in the request a field's raw value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    #[default]
    Body,
    Path,
    Subdomain,
    Query,
    Headers,
    Files,
    Auth,
}

impl Source {
    pub const ALL: [Source; 7] = [
        Source::Body,
        Source::Path,
        Source::Subdomain,
        Source::Query,
        Source::Headers,
        Source::Files,
        Source::Auth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Body => "body",
            Source::Path => "path",
            Source::Subdomain => "subdomain",
            Source::Query => "query",
            Source::Headers => "headers",
            Source::Files => "files",
            Source::Auth => "auth",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = SchemaError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Ok(Source::Body);
        }
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == normalized)
            .ok_or_else(|| SchemaError::UnknownSource { tag: tag.to_string() })
    }
}

/// Primitive conversion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 13] = [
        ScalarKind::Text,
        ScalarKind::Bool,
        ScalarKind::Char,
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::U32,
        ScalarKind::U64,
        ScalarKind::F32,
        ScalarKind::F64,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Text => "string",
            ScalarKind::Bool => "bool",
            ScalarKind::Char => "char",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = match name.as_str() {
            "str" | "text" => "string",
            "boolean" => "bool",
            other => other,
        };
        ScalarKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Inclusive bounds for signed integer kinds.
    pub(crate) fn signed_bounds(&self) -> Option<(i64, i64)> {
        match self {
            ScalarKind::I8 => Some((i8::MIN.into(), i8::MAX.into())),
            ScalarKind::I16 => Some((i16::MIN.into(), i16::MAX.into())),
            ScalarKind::I32 => Some((i32::MIN.into(), i32::MAX.into())),
            ScalarKind::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Inclusive upper bound for unsigned integer kinds.
    pub(crate) fn unsigned_max(&self) -> Option<u64> {
        match self {
            ScalarKind::U8 => Some(u8::MAX.into()),
            ScalarKind::U16 => Some(u16::MAX.into()),
            ScalarKind::U32 => Some(u32::MAX.into()),
            ScalarKind::U64 => Some(u64::MAX),
            _ => None,
        }
    }

    pub(crate) fn zero(&self) -> Value {
        match self {
            ScalarKind::Text => Value::Text(String::new()),
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::Char => Value::Text('\0'.to_string()),
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64 => Value::Int(0),
            ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64 => Value::UInt(0),
            ScalarKind::F32 | ScalarKind::F64 => Value::Float(0.0),
        }
    }
}

/// The type a field's value binds to.
#[derive(Debug, Clone)]
pub enum TargetType {
    Scalar(ScalarKind),
    File,
    List(Box<TargetType>),
    /// A nested object. `boxed` marks a pointer indirection on the target side.
    Object {
        name: String,
        boxed: bool,
    },
    /// A value that may be left unset; its zero value is `Value::Null`.
    Optional(Box<TargetType>),
    Custom(Arc<dyn TypedValueSetter>),
}

impl TargetType {
    pub fn text() -> Self {
        TargetType::Scalar(ScalarKind::Text)
    }

    pub fn list_of(element: TargetType) -> Self {
        TargetType::List(Box::new(element))
    }

    pub fn optional(inner: TargetType) -> Self {
        match inner {
            already @ TargetType::Optional(_) => already,
            inner => TargetType::Optional(Box::new(inner)),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        TargetType::Object {
            name: name.into(),
            boxed: false,
        }
    }

    pub fn custom<S>(setter: S) -> Self
    where
        S: TypedValueSetter + 'static,
    {
        TargetType::Custom(Arc::new(setter))
    }

    /// The type with any `Optional` wrapper removed.
    pub fn base(&self) -> &TargetType {
        match self {
            TargetType::Optional(inner) => inner.base(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TargetType::Optional(_))
    }

    /// True for "file" and "list of file" targets, whatever the field's source.
    pub fn is_file(&self) -> bool {
        match self.base() {
            TargetType::File => true,
            TargetType::List(element) => matches!(element.base(), TargetType::File),
            _ => false,
        }
    }

    pub fn is_file_list(&self) -> bool {
        matches!(self.base(), TargetType::List(element) if matches!(element.base(), TargetType::File))
    }

    pub fn name(&self) -> String {
        match self {
            TargetType::Scalar(kind) => kind.name().to_string(),
            TargetType::File => "file".to_string(),
            TargetType::List(element) => format!("list<{}>", element.name()),
            TargetType::Object { name, .. } => name.clone(),
            TargetType::Optional(inner) => format!("optional<{}>", inner.name()),
            TargetType::Custom(setter) => setter.type_name().to_string(),
        }
    }
}

/// Constraint checked on a value once it has been converted to its target type.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRule {
    /// Characters for text, elements for lists.
    Length { min: Option<usize>, max: Option<usize> },
    Range { min: Option<f64>, max: Option<f64> },
    Regex { pattern: String },
    OneOf { allowed: Vec<String>, case_insensitive: bool },
    Email,
    Url,
    Uuid,
}

impl ValidationRule {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationRule::Length { .. } => "length",
            ValidationRule::Range { .. } => "range",
            ValidationRule::Regex { .. } => "regex",
            ValidationRule::OneOf { .. } => "one_of",
            ValidationRule::Email => "email",
            ValidationRule::Url => "url",
            ValidationRule::Uuid => "uuid",
        }
    }
}

impl FieldDescriptor {
    fn with_shape(name: impl Into<String>, shape: Shape, target: TargetType) -> Self {
        let is_slice = target.is_file_list();
        Self {
            name: name.into(),
            real_name: String::new(),
            shape,
            target,
            is_slice,
            required: true,
            source: Source::Body,
            validations: Vec::new(),
        }
    }

    pub fn scalar(name: impl Into<String>, target: TargetType) -> Self {
        Self::with_shape(name, Shape::Scalar, target)
    }

    /// A list field whose target type is derived from the element's.
    pub fn list(name: impl Into<String>, element: FieldDescriptor) -> Self {
        let target = TargetType::list_of(element.target.clone());
        Self::with_shape(name, Shape::List(Box::new(element)), target)
    }

    pub fn object(name: impl Into<String>, type_name: impl Into<String>, children: Vec<FieldDescriptor>) -> Self {
        Self::with_shape(name, Shape::Object(children), TargetType::object(type_name))
    }

    /// A single uploaded file.
    pub fn file(name: impl Into<String>) -> Self {
        Self::scalar(name, TargetType::File)
    }

    /// Every file uploaded under the field's name.
    pub fn files(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::list(name, FieldDescriptor::file(""))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn real_name(mut self, real_name: impl Into<String>) -> Self {
        self.real_name = real_name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field optional. An absent optional field binds to its zero value.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn boxed(mut self) -> Self {
        if let TargetType::Object { boxed, .. } = &mut self.target {
            *boxed = true;
        }
        self
    }

    pub fn validate(mut self, rule: ValidationRule) -> Self {
        self.validations.push(rule);
        self
    }

    /// Adds a rule checked on every element of a list field.
    pub fn validate_each(mut self, rule: ValidationRule) -> Self {
        if let Shape::List(element) = &mut self.shape {
            element.validations.push(rule);
        }
        self
    }

    /// The name used to find this field in the request: `name`, else `real_name`.
    pub fn lookup_name(&self) -> Option<&str> {
        if !self.name.is_empty() {
            Some(&self.name)
        } else if !self.real_name.is_empty() {
            Some(&self.real_name)
        } else {
            None
        }
    }

    /// Children of an object field, in declared order. Empty for other shapes.
    pub fn children(&self) -> &[FieldDescriptor] {
        match &self.shape {
            Shape::Object(children) => children,
            _ => &[],
        }
    }

    pub fn child(&self, name: &str) -> Option<&FieldDescriptor> {
        self.children().iter().find(|child| child.lookup_name() == Some(name))
    }

    pub fn child_at(&self, index: usize) -> Option<&FieldDescriptor> {
        self.children().get(index)
    }

    pub fn element(&self) -> Option<&FieldDescriptor> {
        match &self.shape {
            Shape::List(element) => Some(element),
            _ => None,
        }
    }

    /// Value bound when the field is optional and absent.
    pub fn zero_value(&self) -> Value {
        if self.target.is_optional() {
            return Value::Null;
        }
        match &self.shape {
            Shape::Object(children) => Value::Object(
                children
                    .iter()
                    .map(|child| (child.entry_name().to_string(), child.zero_value()))
                    .collect(),
            ),
            Shape::List(_) if self.target.is_file_list() => Value::Files(Vec::new()),
            Shape::List(_) => Value::List(Vec::new()),
            Shape::Scalar => match &self.target {
                TargetType::Scalar(kind) => kind.zero(),
                TargetType::List(element) if matches!(element.base(), TargetType::File) => Value::Files(Vec::new()),
                TargetType::List(_) => Value::List(Vec::new()),
                TargetType::Object { .. } => Value::Object(Vec::new()),
                TargetType::Custom(setter) => setter.zero(),
                TargetType::File | TargetType::Optional(_) => Value::Null,
            },
        }
    }

    /// Key under which this field is stored in a bound object.
    pub(crate) fn entry_name(&self) -> &str {
        self.lookup_name().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tags_parse_case_insensitively() {
        assert_eq!("QUERY".parse::<Source>().unwrap(), Source::Query);
        assert_eq!("Headers".parse::<Source>().unwrap(), Source::Headers);
        assert_eq!("".parse::<Source>().unwrap(), Source::Body);
        assert!(matches!(
            "cookie".parse::<Source>(),
            Err(SchemaError::UnknownSource { tag }) if tag == "cookie"
        ));
    }

    #[test]
    fn file_targets_are_detected_through_optional() {
        assert!(TargetType::File.is_file());
        assert!(TargetType::list_of(TargetType::File).is_file());
        assert!(TargetType::optional(TargetType::File).is_file());
        assert!(!TargetType::list_of(TargetType::text()).is_file());
        assert!(FieldDescriptor::files("docs").is_slice);
        assert!(!FieldDescriptor::file("avatar").is_slice);
    }

    #[test]
    fn lookup_name_falls_back_to_real_name() {
        let field = FieldDescriptor::scalar("", TargetType::text()).real_name("X-Token");
        assert_eq!(field.lookup_name(), Some("X-Token"));
        let unnamed = FieldDescriptor::scalar("", TargetType::text());
        assert_eq!(unnamed.lookup_name(), None);
    }

    #[test]
    fn object_zero_value_mirrors_children() {
        let field = FieldDescriptor::object(
            "user",
            "User",
            vec![
                FieldDescriptor::scalar("name", TargetType::text()),
                FieldDescriptor::scalar("age", TargetType::Scalar(ScalarKind::U8)),
                FieldDescriptor::scalar("nick", TargetType::optional(TargetType::text())),
            ],
        );
        assert_eq!(
            field.zero_value(),
            Value::Object(vec![
                ("name".into(), Value::Text(String::new())),
                ("age".into(), Value::UInt(0)),
                ("nick".into(), Value::Null),
            ])
        );
        assert_eq!(field.child_at(1).map(|child| child.name.as_str()), Some("age"));
        assert!(field.child("nick").is_some());
    }
}
