use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Value as JsonValue};

use crate::value::File;

/// Credentials carried by an `Authorization: Basic ...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parses the value of an `Authorization` header. Returns `None` for other
    /// schemes and malformed payloads.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, payload) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }
}

/// Materialized request data, read-only while binding.
///
/// Body values live in a JSON object so that structured bodies can bind into
/// nested objects and lists; url-encoded forms store plain strings there.
#[derive(Debug, Clone, Default)]
pub struct Request {
    form: Map<String, JsonValue>,
    query: BTreeMap<String, Vec<String>>,
    path_args: BTreeMap<String, String>,
    // Keys are lowercased.
    headers: BTreeMap<String, Vec<String>>,
    files: BTreeMap<String, Vec<File>>,
    credentials: Option<BasicCredentials>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn form(&self) -> &Map<String, JsonValue> {
        &self.form
    }

    pub fn form_value(&self, name: &str) -> Option<&JsonValue> {
        self.form.get(name)
    }

    /// First query value for `name`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(|values| values.first()).map(String::as_str)
    }

    pub fn query_all(&self, name: &str) -> &[String] {
        self.query.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn path_arg(&self, name: &str) -> Option<&str> {
        self.path_args.get(name).map(String::as_str)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn files(&self, name: &str) -> Option<&[File]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Username and password from basic auth, when present.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|credentials| (credentials.username.as_str(), credentials.password.as_str()))
    }
}

#[derive(Debug, Default)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Adds a url-encoded form value.
    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.form.insert(name.into(), JsonValue::String(value.into()));
        self
    }

    /// Adds a structured body value.
    pub fn form_json(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.request.form.insert(name.into(), value);
        self
    }

    /// Replaces the whole body with a JSON object. Non-object bodies are ignored.
    pub fn json_body(mut self, body: JsonValue) -> Self {
        if let JsonValue::Object(map) = body {
            self.request.form = map;
        }
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.path_args.insert(name.into(), value.into());
        self
    }

    /// Adds a header. An `Authorization` header with the basic scheme also
    /// sets the request's credentials.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let key = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        if key == "authorization"
            && let Some(credentials) = BasicCredentials::from_header(&value)
        {
            self.request.credentials = Some(credentials);
        }
        self.request.headers.entry(key).or_default().push(value);
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: File) -> Self {
        self.request.files.entry(name.into()).or_default().push(file);
        self
    }

    /// Registers `name` in the file table with no files in it.
    pub fn empty_files(mut self, name: impl Into<String>) -> Self {
        self.request.files.entry(name.into()).or_default();
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.request.credentials = Some(BasicCredentials::new(username, password));
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}
