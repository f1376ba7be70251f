//! The binding state machine.
//!
//! [`decode`] walks a field tree against a request and returns a [`Bound`]
//! envelope. Scalars are converted by their target type's setter, lists decode
//! each element through the element descriptor, and objects visit every child
//! in declared order, collecting all failures before returning.

use serde_json::Value as JsonValue;

use crate::{
    config::DecodeOptions,
    errors::{BindError, aggregate},
    locator::{Located, locate, locate_in},
    request::Request,
    setter::RawInput,
    types::{FieldDescriptor, Shape, Source},
    validators::check_rules,
    value::Value,
};

/// Outcome of binding one field: a value, or the errors that prevented it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    value: Option<Value>,
    errors: Vec<BindError>,
}

impl Bound {
    fn ok(value: Value) -> Self {
        Self {
            value: Some(value),
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<BindError>) -> Self {
        Self { value: None, errors }
    }

    /// The bound value. Always `None` when binding failed.
    pub fn value(&self) -> Option<&Value> {
        if self.has_errors() { None } else { self.value.as_ref() }
    }

    pub fn errors(&self) -> &[BindError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All errors combined into one report.
    pub fn error(&self) -> Option<BindError> {
        aggregate(self.errors.iter().cloned())
    }

    pub fn into_result(self) -> Result<Value, BindError> {
        match aggregate(self.errors) {
            Some(error) => Err(error),
            None => Ok(self.value.unwrap_or_default()),
        }
    }
}

/// Binds `field` against `request` with default options.
pub fn decode(field: &FieldDescriptor, request: &Request) -> Bound {
    decode_with(field, request, &DecodeOptions::default())
}

pub fn decode_with(field: &FieldDescriptor, request: &Request, options: &DecodeOptions) -> Bound {
    log::debug!(
        "binding {} field `{}` ({})",
        field.shape.kind(),
        field.entry_name(),
        field.target.name()
    );
    let bound = Decoder { request, options }.decode_field(field, Scope::Request);
    if bound.has_errors() {
        log::debug!("binding `{}` failed with {} error(s)", field.entry_name(), bound.errors.len());
    }
    bound
}

/// Where a field's data is read from.
#[derive(Debug, Clone, Copy)]
enum Scope<'r> {
    /// Look the field up in the request by its source.
    Request,
    /// The parent already located this field's data.
    Value(Located<'r>),
}

struct Decoder<'r> {
    request: &'r Request,
    options: &'r DecodeOptions,
}

impl<'r> Decoder<'r> {
    fn decode_field(&self, field: &FieldDescriptor, scope: Scope<'r>) -> Bound {
        match &field.shape {
            Shape::Scalar => self.decode_scalar(field, scope),
            Shape::List(element) => self.decode_list(field, element, scope),
            Shape::Object(children) => self.decode_object(field, children, scope),
        }
    }

    fn own_data(&self, field: &FieldDescriptor, scope: Scope<'r>) -> Located<'r> {
        match scope {
            Scope::Request => locate(field, self.request, self.options),
            Scope::Value(located) => located,
        }
    }

    fn child_data(&self, child: &FieldDescriptor, scope: Scope<'r>) -> Located<'r> {
        match scope {
            Scope::Request => locate(child, self.request, self.options),
            Scope::Value(Located::Json(parent)) => locate_in(child, parent, self.options),
            Scope::Value(_) => Located::Absent,
        }
    }

    fn decode_scalar(&self, field: &FieldDescriptor, scope: Scope<'r>) -> Bound {
        let located = self.own_data(field, scope);
        let Some(input) = located.as_input() else {
            return absent(field);
        };

        if field.target.is_file() {
            let Located::Files(files) = located else {
                return Bound::failed(vec![BindError::invalid_type(field)]);
            };
            if field.is_slice {
                return Bound::ok(Value::Files(files.to_vec()));
            }
            // An empty upload list counts as no upload.
            return match files.first() {
                Some(file) => Bound::ok(Value::File(file.clone())),
                None => absent(field),
            };
        }

        match field.target.set(input) {
            Some(value) => validated(field, value),
            None => {
                log::trace!("`{}` is not a valid {}", field.entry_name(), field.target.name());
                Bound::failed(vec![BindError::invalid_type(field)])
            }
        }
    }

    fn decode_list(&self, field: &FieldDescriptor, element: &FieldDescriptor, scope: Scope<'r>) -> Bound {
        let located = self.own_data(field, scope);
        if located.is_absent() {
            return absent(field);
        }

        if field.target.is_file() {
            return match located {
                Located::Files(files) => Bound::ok(Value::Files(files.to_vec())),
                _ => Bound::failed(vec![BindError::invalid_type(field)]),
            };
        }

        let mut values = Vec::new();
        let mut errors = Vec::new();
        for (index, item) in self.list_items(field, located).into_iter().enumerate() {
            let bound = self.decode_field(element, Scope::Value(item));
            if bound.has_errors() {
                errors.extend(bound.errors.into_iter().map(|error| label_element(index, error)));
            } else if let Some(value) = bound.value {
                values.push(value);
            }
        }

        match aggregate(errors) {
            None => validated(field, Value::List(values)),
            Some(error) => finalize(field, error),
        }
    }

    /// Splits a located list value into its elements.
    fn list_items(&self, field: &FieldDescriptor, located: Located<'r>) -> Vec<Located<'r>> {
        let texts: Vec<&'r str> = match located {
            Located::Json(JsonValue::Array(items)) => {
                return items
                    .iter()
                    .map(|item| Located::Json(item).normalize(self.options))
                    .collect();
            }
            Located::Json(JsonValue::String(text)) => vec![text.as_str()],
            // Text located for a query field came from the query string: use every value.
            Located::Text(text) => match (field.source, field.lookup_name()) {
                (Source::Query, Some(name)) => self.request.query_all(name).iter().map(String::as_str).collect(),
                _ => vec![text],
            },
            other => return vec![other],
        };
        texts
            .into_iter()
            .flat_map(|text| match self.options.list_separator {
                Some(separator) => text.split(separator).collect::<Vec<_>>(),
                None => vec![text],
            })
            .map(|text| Located::Text(text).normalize(self.options))
            .collect()
    }

    fn decode_object(&self, field: &FieldDescriptor, children: &[FieldDescriptor], scope: Scope<'r>) -> Bound {
        if let Scope::Value(located) = scope
            && !matches!(located, Located::Json(JsonValue::Object(_)))
        {
            return Bound::failed(vec![BindError::invalid_type(field)]);
        }

        let mut object = Value::Object(
            children
                .iter()
                .map(|child| (child.entry_name().to_string(), child.zero_value()))
                .collect(),
        );
        let mut errors = Vec::new();

        for child in children {
            let located = self.child_data(child, scope);
            if located.is_absent() {
                if child.required {
                    log::trace!("required field `{}` is missing", child.entry_name());
                    errors.push(BindError::missing(child));
                }
                continue;
            }

            let assigned = if child.target.is_file() {
                let input = match located {
                    Located::Files(files) if child.is_slice => RawInput::Files(files),
                    Located::Files(files) => match files.first() {
                        Some(file) => RawInput::Bound(Value::File(file.clone())),
                        None => {
                            if child.required {
                                log::trace!("required field `{}` has no upload", child.entry_name());
                                errors.push(BindError::missing(child));
                            }
                            continue;
                        }
                    },
                    _ => {
                        errors.push(BindError::invalid_type(child));
                        continue;
                    }
                };
                child.target.set(input)
            } else {
                let bound = self.decode_field(child, Scope::Value(located));
                if bound.has_errors() {
                    errors.extend(bound.errors);
                    continue;
                }
                child.target.set(RawInput::Bound(bound.value.unwrap_or_default()))
            };

            match assigned {
                Some(value) => {
                    object.set_entry(child.entry_name(), value);
                }
                None => errors.push(BindError::invalid_type(child)),
            }
        }

        match aggregate(errors) {
            None => Bound::ok(object),
            Some(error) => finalize(field, error),
        }
    }
}

fn absent(field: &FieldDescriptor) -> Bound {
    if field.required {
        log::trace!("required field `{}` is missing", field.entry_name());
        Bound::failed(vec![BindError::missing(field)])
    } else {
        Bound::ok(field.zero_value())
    }
}

fn validated(field: &FieldDescriptor, value: Value) -> Bound {
    let errors = check_rules(field, &value);
    if errors.is_empty() {
        Bound::ok(value)
    } else {
        Bound::failed(errors)
    }
}

/// Keys the aggregate of a field's child or element errors by the field's
/// name, when it has one.
fn finalize(field: &FieldDescriptor, error: BindError) -> Bound {
    let error = match field.lookup_name() {
        Some(name) => BindError::nested(name, error),
        None => error,
    };
    Bound::failed(vec![error])
}

/// Keys an element's error by its position in the list.
fn label_element(index: usize, error: BindError) -> BindError {
    let position = index.to_string();
    match error {
        BindError::Missing { field } if field.is_empty() => BindError::Missing { field: position },
        BindError::InvalidType { field, expected } if field.is_empty() => BindError::InvalidType {
            field: position,
            expected,
        },
        BindError::Invalid { field, rule, message } if field.is_empty() => BindError::Invalid {
            field: position,
            rule,
            message,
        },
        other => BindError::nested(position, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::{ScalarKind, TargetType, ValidationRule},
        value::File,
    };
    use serde_json::json;

    fn int(name: &str) -> FieldDescriptor {
        FieldDescriptor::scalar(name, TargetType::Scalar(ScalarKind::I32))
    }

    #[test]
    fn bound_hides_value_when_errors_exist() {
        let bound = decode(&int("age"), &Request::default());
        assert!(bound.has_errors());
        assert_eq!(bound.value(), None);
        assert_eq!(bound.errors(), &[BindError::Missing { field: "age".into() }]);
    }

    #[test]
    fn scalar_with_empty_file_list_is_treated_as_absent() {
        let request = Request::builder().empty_files("avatar").build();
        let required = decode(&FieldDescriptor::file("avatar"), &request);
        assert_eq!(required.errors(), &[BindError::Missing { field: "avatar".into() }]);

        let optional = decode(&FieldDescriptor::file("avatar").optional(), &request);
        assert_eq!(optional.value(), Some(&Value::Null));
    }

    #[test]
    fn object_child_with_empty_file_list_is_treated_as_absent() {
        let request = Request::builder().empty_files("avatar").build();
        let root = FieldDescriptor::object("", "Upload", vec![FieldDescriptor::file("avatar")]);
        let error = decode(&root, &request).into_result().unwrap_err();
        assert_eq!(error.to_string(), r#"{"avatar":"field is required"}"#);

        let root = FieldDescriptor::object("", "Upload", vec![FieldDescriptor::file("avatar").optional()]);
        assert_eq!(
            decode(&root, &request).into_result(),
            Ok(Value::Object(vec![("avatar".into(), Value::Null)]))
        );
    }

    #[test]
    fn text_children_accept_json_numbers_and_bools() {
        let request = Request::builder()
            .form_json("addr", json!({"zip": 12345, "verified": true}))
            .build();
        let root = FieldDescriptor::object(
            "",
            "Signup",
            vec![FieldDescriptor::object(
                "addr",
                "Address",
                vec![
                    FieldDescriptor::scalar("zip", TargetType::text()),
                    FieldDescriptor::scalar("verified", TargetType::text()),
                ],
            )],
        );
        assert_eq!(
            decode(&root, &request).into_result(),
            Ok(Value::Object(vec![(
                "addr".into(),
                Value::Object(vec![
                    ("zip".into(), Value::Text("12345".into())),
                    ("verified".into(), Value::Text("true".into())),
                ])
            )]))
        );
    }

    #[test]
    fn file_field_from_a_text_source_is_invalid() {
        let request = Request::builder().query("avatar", "me.png").build();
        let field = FieldDescriptor::file("avatar").source(Source::Query);
        let bound = decode(&field, &request);
        assert!(bound.errors()[0].is_invalid_type());
    }

    #[test]
    fn list_elements_are_labelled_by_position() {
        let request = Request::builder().form_json("ids", json!([1, "x", 3, null])).build();
        let field = FieldDescriptor::list("ids", int(""));
        let error = decode(&field, &request).into_result().unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"{"ids":[{"1":"invalid type, expected i32"},{"3":"field is required"}]}"#
        );
    }

    #[test]
    fn list_reads_every_query_value() {
        let request = Request::builder().query("tag", "a").query("tag", "b").build();
        let field = FieldDescriptor::list("tag", FieldDescriptor::scalar("", TargetType::text())).source(Source::Query);
        assert_eq!(
            decode(&field, &request).into_result(),
            Ok(Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]))
        );
    }

    #[test]
    fn list_separator_splits_text() {
        let request = Request::builder().query("ids", "1,2,3").build();
        let field = FieldDescriptor::list("ids", int("")).source(Source::Query);
        let options = DecodeOptions::default().with_list_separator(',');
        assert_eq!(
            decode_with(&field, &request, &options).into_result(),
            Ok(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
    }

    #[test]
    fn list_rules_apply_to_the_whole_list() {
        let request = Request::builder().form_json("tags", json!(["a"])).build();
        let field = FieldDescriptor::list("tags", FieldDescriptor::scalar("", TargetType::text())).validate(
            ValidationRule::Length {
                min: Some(2),
                max: None,
            },
        );
        let error = decode(&field, &request).into_result().unwrap_err();
        assert_eq!(error.to_string(), r#"{"tags":"length must be at least 2"}"#);
    }

    #[test]
    fn nested_object_must_be_an_object() {
        let request = Request::builder().form("addr", "Main Street").build();
        let root = FieldDescriptor::object(
            "",
            "Signup",
            vec![FieldDescriptor::object("addr", "Address", vec![FieldDescriptor::scalar("zip", TargetType::text())])],
        );
        let error = decode(&root, &request).into_result().unwrap_err();
        assert_eq!(error.to_string(), r#"{"addr":"invalid type, expected Address"}"#);
    }

    #[test]
    fn object_assigns_file_children() {
        let request = Request::builder()
            .file("avatar", File::new("a.png"))
            .file("docs", File::new("1.pdf"))
            .file("docs", File::new("2.pdf"))
            .build();
        let root = FieldDescriptor::object(
            "",
            "Upload",
            vec![FieldDescriptor::file("avatar"), FieldDescriptor::files("docs")],
        );
        let value = decode(&root, &request).into_result().unwrap();
        assert_eq!(value.get("avatar"), Some(&Value::File(File::new("a.png"))));
        assert_eq!(value.get("docs").and_then(Value::as_files).map(<[File]>::len), Some(2));
    }
}
