use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprArray, Field, Fields, GenericArgument, Ident, LitBool, LitInt,
    LitStr, PathArguments, Result, Type, parse_macro_input, spanned::Spanned,
};

mod parsed;

use parsed::ParsedStruct;

/// Derives `reqbind::Bindable` for a struct with named fields.
///
/// ```text
/// #[derive(Bind)]
/// #[bind(name = "Signup")]
/// struct Signup {
///     #[bind(validate(email))]
///     email: String,
///     #[bind(source = "query", rename = "p", validate(range(min = 1)))]
///     page: Option<u32>,
///     #[bind(validate(length(max = 5), each(length(min = 2))))]
///     tags: Vec<String>,
///     address: Address,
/// }
/// ```
///
/// Field attributes: `rename`, `source`, `required`, `optional` and
/// `validate(...)` with `length`, `range`, `regex`, `one_of`, `email`, `url`,
/// `uuid` and `each(...)` for list elements. `Option<T>` fields are optional
/// unless marked `required`; every other field is required unless marked
/// `optional`.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedStruct::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
