use super::*;
use super::field::ParsedField;

pub(crate) struct ParsedStruct {
    ident: Ident,
    /// Type name reported in `invalid type` errors.
    type_name: String,
    generics: syn::Generics,
    fields: Vec<ParsedField>,
}

impl ParsedStruct {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut type_name = input.ident.to_string();

        for attr in &input.attrs {
            if attr.path().is_ident("bind") {
                Self::parse_container_attr(attr, &mut type_name)?;
            }
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => {
                    let mut parsed = Vec::new();
                    for field in &named.named {
                        parsed.push(ParsedField::from_field(field)?);
                    }
                    parsed
                }
                _ => return Err(Error::new(input.ident.span(), "Bind requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "Bind can only be derived for structs")),
        };

        let mut seen: Vec<&str> = Vec::new();
        for field in &fields {
            let name = field.lookup_name();
            if seen.contains(&name) {
                return Err(Error::new(
                    field.span(),
                    format!("duplicate field name `{}` in {}", name, type_name),
                ));
            }
            seen.push(name);
        }

        Ok(Self {
            ident: input.ident.clone(),
            type_name,
            generics: input.generics.clone(),
            fields,
        })
    }

    fn parse_container_attr(attr: &Attribute, type_name: &mut String) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().trim().is_empty() {
                    return Err(Error::new(value.span(), "#[bind(name = ...)] cannot be empty"));
                }
                *type_name = value.value();
                Ok(())
            } else {
                Err(meta.error("unknown bind container attribute, expected `name`"))
            }
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let ident = &self.ident;
        let type_name = LitStr::new(&self.type_name, Span::call_site());
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();

        let children = self.fields.iter().map(ParsedField::descriptor_tokens);
        let takes = self.fields.iter().map(ParsedField::take_tokens);

        quote! {
            impl #impl_generics ::reqbind::Bindable for #ident #ty_generics #where_clause {
                fn target_type() -> ::reqbind::TargetType {
                    ::reqbind::TargetType::object(#type_name)
                }

                fn descriptor(name: &str) -> ::reqbind::FieldDescriptor {
                    ::reqbind::FieldDescriptor::object(name, #type_name, vec![#(#children),*])
                }

                fn from_value(value: ::reqbind::Value) -> ::std::result::Result<Self, ::reqbind::ConvertError> {
                    let mut entries = ::reqbind::ObjectEntries::new(value, #type_name)?;
                    Ok(Self {
                        #(#takes,)*
                    })
                }
            }
        }
    }
}
