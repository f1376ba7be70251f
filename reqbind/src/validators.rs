use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::{
    errors::BindError,
    types::{FieldDescriptor, ValidationRule},
    value::Value,
};

static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Returns `true` if the provided string parses as a UUID.
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Matches `value` against `pattern`, compiling each pattern once.
/// Returns `None` when the pattern does not compile.
pub fn matches_pattern(pattern: &str, value: &str) -> Option<bool> {
    let mut cache = REGEX_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(pattern) {
        return Some(regex.is_match(value));
    }
    let regex = Regex::new(pattern).ok()?;
    let matched = regex.is_match(value);
    cache.insert(pattern.to_string(), regex);
    Some(matched)
}

/// Checks every validation rule of `field` against its converted value.
///
/// Rules that do not apply to the value's kind (e.g. `email` on a number)
/// are skipped, and null values are never checked.
pub fn check_rules(field: &FieldDescriptor, value: &Value) -> Vec<BindError> {
    if value.is_null() {
        return Vec::new();
    }
    let mut errors = Vec::new();
    for rule in &field.validations {
        if let Some(message) = violation(rule, value) {
            log::trace!("field `{}` failed {} rule: {}", field.entry_name(), rule.code(), message);
            errors.push(BindError::invalid(field, rule.code(), message));
        }
    }
    errors
}

fn violation(rule: &ValidationRule, value: &Value) -> Option<String> {
    match rule {
        ValidationRule::Length { min, max } => {
            let len = value.len()?;
            if let Some(min_len) = min
                && len < *min_len
            {
                return Some(format!("length must be at least {}", min_len));
            }
            if let Some(max_len) = max
                && len > *max_len
            {
                return Some(format!("length must be at most {}", max_len));
            }
            None
        }
        ValidationRule::Range { min, max } => {
            let candidate = value.as_f64()?;
            if let Some(lower) = min
                && candidate < *lower
            {
                return Some(format!("value must be at least {}", lower));
            }
            if let Some(upper) = max
                && candidate > *upper
            {
                return Some(format!("value must be at most {}", upper));
            }
            None
        }
        ValidationRule::Regex { pattern } => {
            let candidate = value.as_str()?;
            match matches_pattern(pattern, candidate) {
                Some(false) => Some(format!("value does not match pattern {}", pattern)),
                _ => None,
            }
        }
        ValidationRule::OneOf {
            allowed,
            case_insensitive,
        } => {
            let candidate = value.as_str()?;
            let found = if *case_insensitive {
                allowed.iter().any(|option| option.eq_ignore_ascii_case(candidate))
            } else {
                allowed.iter().any(|option| option == candidate)
            };
            (!found).then(|| format!("value must be one of {:?}", allowed))
        }
        ValidationRule::Email => {
            let candidate = value.as_str()?;
            (!is_valid_email(candidate)).then(|| "value must be a valid email address".to_string())
        }
        ValidationRule::Url => {
            let candidate = value.as_str()?;
            (!is_valid_url(candidate)).then(|| "value must be a valid URL".to_string())
        }
        ValidationRule::Uuid => {
            let candidate = value.as_str()?;
            (!is_valid_uuid(candidate)).then(|| "value must be a valid UUID".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScalarKind, TargetType};

    #[test]
    fn email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("invalid"));
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("not-a-url"));
    }

    #[test]
    fn uuid_validation() {
        assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_uuid("not-a-uuid"));
    }

    #[test]
    fn bad_patterns_are_reported_as_none() {
        assert_eq!(matches_pattern("^[a-z]+$", "slug"), Some(true));
        assert_eq!(matches_pattern("^[a-z]+$", "Slug"), Some(false));
        assert_eq!(matches_pattern("(", "x"), None);
    }

    #[test]
    fn collects_every_violated_rule() {
        let field = FieldDescriptor::scalar("slug", TargetType::text())
            .validate(ValidationRule::Length {
                min: Some(5),
                max: None,
            })
            .validate(ValidationRule::Regex {
                pattern: "^[a-z-]+$".into(),
            })
            .validate(ValidationRule::Email);
        let errors = check_rules(&field, &Value::Text("No".into()));
        let rules: Vec<_> = errors
            .iter()
            .map(|error| match error {
                BindError::Invalid { rule, .. } => rule.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(rules, vec!["length", "regex", "email"]);
    }

    #[test]
    fn range_applies_to_numbers_only() {
        let field = FieldDescriptor::scalar("age", TargetType::Scalar(ScalarKind::U8)).validate(ValidationRule::Range {
            min: Some(18.0),
            max: Some(120.0),
        });
        assert_eq!(check_rules(&field, &Value::UInt(30)), Vec::new());
        assert_eq!(
            check_rules(&field, &Value::UInt(12)),
            vec![BindError::Invalid {
                field: "age".into(),
                rule: "range".into(),
                message: "value must be at least 18".into(),
            }]
        );
    }

    #[test]
    fn one_of_can_ignore_case() {
        let field = FieldDescriptor::scalar("plan", TargetType::text()).validate(ValidationRule::OneOf {
            allowed: vec!["free".into(), "pro".into()],
            case_insensitive: true,
        });
        assert!(check_rules(&field, &Value::Text("PRO".into())).is_empty());
        assert_eq!(check_rules(&field, &Value::Text("team".into())).len(), 1);
    }
}
