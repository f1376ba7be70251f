use super::*;
use super::field::{FieldBase, TypeInfo};

pub(super) struct FieldValidation {
    scope: ValidationScope,
    data: ValidationData,
}

#[derive(Clone, Copy)]
enum ValidationScope {
    Field,
    EachElement,
}

enum ValidationData {
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Range {
        min: Option<TokenStream2>,
        max: Option<TokenStream2>,
    },
    Regex {
        pattern: String,
    },
    OneOf {
        allowed: Vec<String>,
        case_insensitive: bool,
    },
    Email,
    Url,
    Uuid,
}

impl FieldValidation {
    /// Expression applying this rule to the `field` descriptor being built.
    pub(super) fn apply_tokens(&self) -> TokenStream2 {
        let rule = self.rule_tokens();
        match self.scope {
            ValidationScope::Field => quote! { field.validate(#rule) },
            ValidationScope::EachElement => quote! { field.validate_each(#rule) },
        }
    }

    fn rule_tokens(&self) -> TokenStream2 {
        match &self.data {
            ValidationData::Length { min, max } => {
                let min = optional_usize_tokens(*min);
                let max = optional_usize_tokens(*max);
                quote! { ::reqbind::ValidationRule::Length { min: #min, max: #max } }
            }
            ValidationData::Range { min, max } => {
                let min = optional_float_tokens(min.as_ref());
                let max = optional_float_tokens(max.as_ref());
                quote! { ::reqbind::ValidationRule::Range { min: #min, max: #max } }
            }
            ValidationData::Regex { pattern } => {
                let lit = LitStr::new(pattern, Span::call_site());
                quote! { ::reqbind::ValidationRule::Regex { pattern: #lit.to_string() } }
            }
            ValidationData::OneOf {
                allowed,
                case_insensitive,
            } => {
                let allowed = allowed.iter().map(|value| {
                    let lit = LitStr::new(value, Span::call_site());
                    quote! { #lit.to_string() }
                });
                quote! {
                    ::reqbind::ValidationRule::OneOf {
                        allowed: vec![#(#allowed),*],
                        case_insensitive: #case_insensitive,
                    }
                }
            }
            ValidationData::Email => quote! { ::reqbind::ValidationRule::Email },
            ValidationData::Url => quote! { ::reqbind::ValidationRule::Url },
            ValidationData::Uuid => quote! { ::reqbind::ValidationRule::Uuid },
        }
    }
}

/// Parses one entry of `#[bind(validate(...))]`.
pub(super) fn parse_validation_rule(
    rule: ParseNestedMeta,
    ty: &TypeInfo,
    validations: &mut Vec<FieldValidation>,
    field_name: &str,
) -> Result<()> {
    if rule.path.is_ident("each") {
        let element = ty
            .element
            .ok_or_else(|| Error::new(rule.path.span(), "each validator requires a Vec<T> field"))?;
        return rule.parse_nested_meta(|inner| {
            let data = parse_rule_data(&inner, element, field_name)?;
            validations.push(FieldValidation {
                scope: ValidationScope::EachElement,
                data,
            });
            Ok(())
        });
    }

    let data = parse_rule_data(&rule, ty.base, field_name)?;
    validations.push(FieldValidation {
        scope: ValidationScope::Field,
        data,
    });
    Ok(())
}

fn parse_rule_data(rule: &ParseNestedMeta, base: FieldBase, field_name: &str) -> Result<ValidationData> {
    let ident = rule
        .path
        .get_ident()
        .cloned()
        .ok_or_else(|| Error::new(rule.path.span(), format!("unsupported validator on `{}`", field_name)))?;
    let span = rule.path.span();

    match ident.to_string().as_str() {
        "length" => {
            ensure_length_supported(base, span)?;
            let mut min = None;
            let mut max = None;
            rule.parse_nested_meta(|item| {
                if item.path.is_ident("min") {
                    let lit: LitInt = item.value()?.parse()?;
                    min = Some(lit.base10_parse()?);
                } else if item.path.is_ident("max") {
                    let lit: LitInt = item.value()?.parse()?;
                    max = Some(lit.base10_parse()?);
                } else {
                    return Err(item.error("unknown length argument, expected `min` or `max`"));
                }
                Ok(())
            })?;
            if let (Some(min_len), Some(max_len)) = (min, max)
                && min_len > max_len
            {
                return Err(Error::new(span, "length min cannot exceed max"));
            }
            Ok(ValidationData::Length { min, max })
        }
        "range" => {
            ensure_range_supported(base, span)?;
            let mut min = None;
            let mut max = None;
            rule.parse_nested_meta(|item| {
                if item.path.is_ident("min") {
                    let expr: Expr = item.value()?.parse()?;
                    min = Some(expr.to_token_stream());
                } else if item.path.is_ident("max") {
                    let expr: Expr = item.value()?.parse()?;
                    max = Some(expr.to_token_stream());
                } else {
                    return Err(item.error("unknown range argument, expected `min` or `max`"));
                }
                Ok(())
            })?;
            Ok(ValidationData::Range { min, max })
        }
        "regex" => {
            ensure_string_supported(base, span, "regex")?;
            let pattern: LitStr = rule.value()?.parse()?;
            ensure_valid_regex(&pattern.value(), pattern.span())?;
            Ok(ValidationData::Regex {
                pattern: pattern.value(),
            })
        }
        "one_of" => {
            ensure_string_supported(base, span, "one_of")?;
            let mut allowed = Vec::new();
            let mut case_insensitive = false;
            rule.parse_nested_meta(|item| {
                if item.path.is_ident("allowed") {
                    let array: ExprArray = item.value()?.parse()?;
                    for expr in array.elems {
                        match expr {
                            Expr::Lit(expr_lit) => match expr_lit.lit {
                                syn::Lit::Str(lit) => allowed.push(lit.value()),
                                _ => return Err(item.error("allowed expects string literals")),
                            },
                            _ => return Err(item.error("allowed expects string literals")),
                        }
                    }
                } else if item.path.is_ident("case_insensitive") {
                    if item.input.peek(syn::Token![=]) {
                        let lit: LitBool = item.value()?.parse()?;
                        case_insensitive = lit.value;
                    } else {
                        case_insensitive = true;
                    }
                } else {
                    return Err(item.error("unknown one_of argument, expected `allowed` or `case_insensitive`"));
                }
                Ok(())
            })?;
            if allowed.is_empty() {
                return Err(Error::new(span, "one_of validator needs at least one allowed value"));
            }
            Ok(ValidationData::OneOf {
                allowed,
                case_insensitive,
            })
        }
        "email" => {
            ensure_string_supported(base, span, "email")?;
            Ok(ValidationData::Email)
        }
        "url" => {
            ensure_string_supported(base, span, "url")?;
            Ok(ValidationData::Url)
        }
        "uuid" => {
            ensure_string_supported(base, span, "uuid")?;
            Ok(ValidationData::Uuid)
        }
        other => Err(Error::new(
            span,
            format!("unknown bind validator `{}` on field `{}`", other, field_name),
        )),
    }
}

fn optional_usize_tokens(value: Option<usize>) -> TokenStream2 {
    match value {
        Some(v) => quote! { Some(#v) },
        None => quote! { None },
    }
}

fn optional_float_tokens(value: Option<&TokenStream2>) -> TokenStream2 {
    match value {
        Some(expr) => quote! { Some((#expr) as f64) },
        None => quote! { None },
    }
}

fn ensure_length_supported(base: FieldBase, span: Span) -> Result<()> {
    match base {
        FieldBase::String | FieldBase::Vec => Ok(()),
        _ => Err(Error::new(span, "length validator only supported for strings and collections")),
    }
}

fn ensure_range_supported(base: FieldBase, span: Span) -> Result<()> {
    match base {
        FieldBase::Numeric => Ok(()),
        _ => Err(Error::new(span, "range validator only supported for numeric fields")),
    }
}

fn ensure_string_supported(base: FieldBase, span: Span, validator: &str) -> Result<()> {
    match base {
        FieldBase::String => Ok(()),
        _ => Err(Error::new(
            span,
            format!("{} validator only supported for string fields", validator),
        )),
    }
}

fn ensure_valid_regex(pattern: &str, span: Span) -> Result<()> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|err| Error::new(span, format!("invalid regex pattern: {}", err)))
}
