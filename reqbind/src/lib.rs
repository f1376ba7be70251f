//! reqbind core library.
//!
//! Binds the data of an incoming HTTP request (form body, query string, path
//! arguments, headers, uploaded files and basic-auth credentials) into typed
//! values described by a field tree, collecting every missing, mistyped or
//! invalid field into one structured error instead of stopping at the first.

extern crate self as reqbind;

pub mod bindable;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod locator;
pub mod request;
pub mod schema;
pub mod setter;
pub mod types;
pub mod validators;
pub mod value;

pub use bindable::{Bindable, ObjectEntries, bind, bind_with};
pub use config::DecodeOptions;
pub use decoder::{Bound, decode, decode_with};
pub use errors::*;
pub use locator::{Located, locate, locate_in};
pub use request::{BasicCredentials, Request, RequestBuilder};
pub use reqbind_macros::Bind;
pub use schema::{RequestFixture, SchemaField, SchemaRule};
pub use setter::{DateSetter, DateTimeSetter, RawInput, TypedValueSetter, UuidSetter};
pub use types::{FieldDescriptor, ScalarKind, Shape, Source, TargetType, ValidationRule};
pub use value::{File, Value};
