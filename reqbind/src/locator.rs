use serde_json::Value as JsonValue;

use crate::{
    config::DecodeOptions,
    request::Request,
    setter::RawInput,
    types::{FieldDescriptor, Source},
    value::File,
};

/// Raw data found for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Located<'r> {
    Absent,
    Text(&'r str),
    Json(&'r JsonValue),
    Files(&'r [File]),
}

impl<'r> Located<'r> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Located::Absent)
    }

    /// True when the data came from the uploaded-file table.
    pub fn is_file(&self) -> bool {
        matches!(self, Located::Files(_))
    }

    pub fn as_input(&self) -> Option<RawInput<'r>> {
        match *self {
            Located::Absent => None,
            Located::Text(text) => Some(RawInput::Text(text)),
            Located::Json(json) => Some(RawInput::Json(json)),
            Located::Files(files) => Some(RawInput::Files(files)),
        }
    }

    pub(crate) fn normalize(self, options: &DecodeOptions) -> Self {
        let text = match self {
            Located::Json(JsonValue::Null) => return Located::Absent,
            Located::Json(JsonValue::String(text)) => text.as_str(),
            Located::Text(text) => text,
            other => return other,
        };
        let text = if options.trim_text { text.trim() } else { text };
        if text.is_empty() && options.empty_text_is_absent {
            Located::Absent
        } else if options.trim_text || matches!(self, Located::Text(_)) {
            Located::Text(text)
        } else {
            self
        }
    }
}

/// Finds a field's raw value in the request, according to its source.
///
/// Fields whose target is a file (or a list of files) read the file table
/// when their source is `body` or `files`.
pub fn locate<'r>(field: &FieldDescriptor, request: &'r Request, options: &DecodeOptions) -> Located<'r> {
    let Some(name) = field.lookup_name() else {
        return Located::Absent;
    };
    let is_file = field.target.is_file();

    let located = match field.source {
        Source::Body if is_file => files(request, name),
        Source::Body => request.form_value(name).map_or(Located::Absent, Located::Json),
        Source::Path | Source::Subdomain => text(request.path_arg(name)),
        Source::Files => files(request, name),
        Source::Headers => text(request.header(name)),
        Source::Query => text(request.query(name)),
        // Credentials are passed through verbatim: never trimmed or blanked.
        Source::Auth => {
            return match request.basic_auth() {
                Some((username, _)) if name == "username" => Located::Text(username),
                Some((_, password)) if name == "password" => Located::Text(password),
                _ => Located::Absent,
            };
        }
    };
    located.normalize(options)
}

/// Finds a child field inside a value its parent already located.
///
/// Only JSON objects have children; files never appear inside a body value.
pub fn locate_in<'r>(field: &FieldDescriptor, parent: &'r JsonValue, options: &DecodeOptions) -> Located<'r> {
    let Some(name) = field.lookup_name() else {
        return Located::Absent;
    };
    if field.target.is_file() {
        return Located::Absent;
    }
    match parent {
        JsonValue::Object(map) => map.get(name).map_or(Located::Absent, Located::Json).normalize(options),
        _ => Located::Absent,
    }
}

fn text(value: Option<&str>) -> Located<'_> {
    value.map_or(Located::Absent, Located::Text)
}

fn files<'r>(request: &'r Request, name: &str) -> Located<'r> {
    request.files(name).map_or(Located::Absent, Located::Files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScalarKind, TargetType};
    use serde_json::json;

    fn text_field(name: &str, source: Source) -> FieldDescriptor {
        FieldDescriptor::scalar(name, TargetType::text()).source(source)
    }

    fn request() -> Request {
        Request::builder()
            .form("name", "ada")
            .form("blank", "")
            .form_json("addr", json!({"zip": "12345"}))
            .query("page", "2")
            .path("id", "42")
            .header("X-Token", "secret")
            .file("avatar", File::new("me.png"))
            .basic_auth("ada", "hunter2")
            .build()
    }

    #[test]
    fn dispatches_on_source() {
        let request = request();
        let options = DecodeOptions::default();
        assert_eq!(
            locate(&text_field("name", Source::Body), &request, &options),
            Located::Json(&json!("ada"))
        );
        assert_eq!(locate(&text_field("page", Source::Query), &request, &options), Located::Text("2"));
        assert_eq!(locate(&text_field("id", Source::Path), &request, &options), Located::Text("42"));
        assert_eq!(locate(&text_field("id", Source::Subdomain), &request, &options), Located::Text("42"));
        assert_eq!(
            locate(&text_field("x-token", Source::Headers), &request, &options),
            Located::Text("secret")
        );
        assert!(locate(&text_field("avatar", Source::Files), &request, &options).is_file());
        assert!(locate(&text_field("page", Source::Body), &request, &options).is_absent());
    }

    #[test]
    fn body_file_fields_read_the_file_table() {
        let request = request();
        let located = locate(&FieldDescriptor::file("avatar"), &request, &DecodeOptions::default());
        assert_eq!(located, Located::Files(&[File::new("me.png")]));
    }

    #[test]
    fn auth_exposes_only_username_and_password() {
        let request = request();
        let options = DecodeOptions::default();
        assert_eq!(locate(&text_field("username", Source::Auth), &request, &options), Located::Text("ada"));
        assert_eq!(
            locate(&text_field("password", Source::Auth), &request, &options),
            Located::Text("hunter2")
        );
        assert!(locate(&text_field("token", Source::Auth), &request, &options).is_absent());
        let anonymous = Request::builder().build();
        assert!(locate(&text_field("username", Source::Auth), &anonymous, &options).is_absent());
    }

    #[test]
    fn credentials_ignore_text_normalization() {
        let request = Request::builder().basic_auth("ada", "  secret ").build();
        let options = DecodeOptions::default().trimmed();
        assert_eq!(
            locate(&text_field("password", Source::Auth), &request, &options),
            Located::Text("  secret ")
        );

        let blank = Request::builder().basic_auth("ada", "").build();
        assert_eq!(
            locate(&text_field("password", Source::Auth), &blank, &DecodeOptions::default()),
            Located::Text("")
        );
    }

    #[test]
    fn unnamed_fields_cannot_be_located() {
        let field = FieldDescriptor::scalar("", TargetType::Scalar(ScalarKind::I32));
        assert!(locate(&field, &request(), &DecodeOptions::default()).is_absent());
    }

    #[test]
    fn empty_text_handling_follows_options() {
        let request = request();
        let field = text_field("blank", Source::Body);
        assert!(locate(&field, &request, &DecodeOptions::default()).is_absent());
        assert_eq!(
            locate(&field, &request, &DecodeOptions::default().keep_empty_text()),
            Located::Json(&json!(""))
        );
    }

    #[test]
    fn nested_lookup_reads_parent_object() {
        let parent = json!({"zip": "12345", "none": null});
        let options = DecodeOptions::default();
        assert_eq!(
            locate_in(&text_field("zip", Source::Body), &parent, &options),
            Located::Json(&json!("12345"))
        );
        assert!(locate_in(&text_field("none", Source::Body), &parent, &options).is_absent());
        assert!(locate_in(&text_field("zip", Source::Body), &json!("flat"), &options).is_absent());
    }
}
