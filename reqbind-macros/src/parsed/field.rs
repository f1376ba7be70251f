use super::*;
use super::validation::{FieldValidation, parse_validation_rule};

const SOURCES: [(&str, &str); 7] = [
    ("body", "Body"),
    ("path", "Path"),
    ("subdomain", "Subdomain"),
    ("query", "Query"),
    ("headers", "Headers"),
    ("files", "Files"),
    ("auth", "Auth"),
];

pub(super) struct ParsedField {
    ident: Ident,
    ty: Type,
    /// `rename` if given, else the Rust field name.
    name: String,
    source: Option<Ident>,
    required: Option<bool>,
    validations: Vec<FieldValidation>,
}

#[derive(Clone)]
pub(super) struct TypeInfo {
    pub base: FieldBase,
    pub element: Option<FieldBase>,
}

#[derive(Clone, Copy, PartialEq)]
pub(super) enum FieldBase {
    String,
    Vec,
    Numeric,
    Boolean,
    Other,
}

impl ParsedField {
    pub(super) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Bind requires named fields"))?;
        let field_name = ident.to_string();
        let info = classify_type(&field.ty);

        let mut name = field_name.clone();
        let mut source = None;
        let mut required = None;
        let mut validations = Vec::new();

        for attr in &field.attrs {
            if attr.path().is_ident("bind") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let value: LitStr = meta.value()?.parse()?;
                        if value.value().is_empty() {
                            return Err(Error::new(value.span(), "#[bind(rename = ...)] cannot be empty"));
                        }
                        name = value.value();
                    } else if meta.path.is_ident("source") {
                        let value: LitStr = meta.value()?.parse()?;
                        source = Some(parse_source(&value)?);
                    } else if meta.path.is_ident("required") {
                        if required == Some(false) {
                            return Err(meta.error("field cannot be both required and optional"));
                        }
                        required = Some(true);
                    } else if meta.path.is_ident("optional") {
                        if required == Some(true) {
                            return Err(meta.error("field cannot be both required and optional"));
                        }
                        required = Some(false);
                    } else if meta.path.is_ident("validate") {
                        meta.parse_nested_meta(|rule| parse_validation_rule(rule, &info, &mut validations, &field_name))?;
                    } else {
                        let key = meta.path.to_token_stream().to_string();
                        return Err(meta.error(format!("unknown bind attribute `{}` on field `{}`", key, field_name)));
                    }
                    Ok(())
                })?;
            }
        }

        Ok(Self {
            ident,
            ty: field.ty.clone(),
            name,
            source,
            required,
            validations,
        })
    }

    pub(super) fn lookup_name(&self) -> &str {
        &self.name
    }

    pub(super) fn span(&self) -> Span {
        self.ident.span()
    }

    pub(super) fn descriptor_tokens(&self) -> TokenStream2 {
        let ty = &self.ty;
        let name = LitStr::new(&self.name, Span::call_site());
        let real_name = LitStr::new(&self.ident.to_string(), Span::call_site());

        let source = self.source.as_ref().map(|variant| {
            quote! { field.source = ::reqbind::Source::#variant; }
        });
        let required = self.required.map(|required| {
            quote! { field.required = #required; }
        });
        let rules = self.validations.iter().map(FieldValidation::apply_tokens);

        quote! {
            {
                let mut field = <#ty as ::reqbind::Bindable>::descriptor(#name).real_name(#real_name);
                #source
                #required
                #( field = #rules; )*
                field
            }
        }
    }

    pub(super) fn take_tokens(&self) -> TokenStream2 {
        let ident = &self.ident;
        let ty = &self.ty;
        let name = LitStr::new(&self.name, Span::call_site());
        quote! { #ident: entries.take::<#ty>(#name)? }
    }
}

fn parse_source(value: &LitStr) -> Result<Ident> {
    let tag = value.value().trim().to_ascii_lowercase();
    SOURCES
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, variant)| Ident::new(variant, value.span()))
        .ok_or_else(|| {
            let expected: Vec<&str> = SOURCES.iter().map(|(name, _)| *name).collect();
            Error::new(
                value.span(),
                format!("unknown source `{}`, expected one of {}", value.value(), expected.join(", ")),
            )
        })
}

pub(super) fn classify_type(ty: &Type) -> TypeInfo {
    if let Some(inner) = unwrap_generic(ty, "Option").or_else(|| unwrap_generic(ty, "Box")) {
        return classify_type(inner);
    }

    if let Some(inner) = unwrap_generic(ty, "Vec") {
        let element = classify_type(inner);
        return TypeInfo {
            base: FieldBase::Vec,
            element: Some(element.base),
        };
    }

    let base = match last_segment(ty).map(|ident| ident.to_string()).as_deref() {
        Some("String") => FieldBase::String,
        Some("bool") => FieldBase::Boolean,
        Some("i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "f32" | "f64") => FieldBase::Numeric,
        _ => FieldBase::Other,
    };
    TypeInfo {
        base,
        element: None,
    }
}

fn last_segment(ty: &Type) -> Option<&Ident> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => {
            type_path.path.segments.last().map(|segment| &segment.ident)
        }
        _ => None,
    }
}

fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
