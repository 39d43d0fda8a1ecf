//! Rule-table validation over JSON objects.
//!
//! ```text
//! validate(&body, &[("email", &["required", "email"]), ("age", &["min:18"])])
//! ```
//!
//! Rules: `required`, `email`, `min:N`, `max:N`, `in:a,b,...`, `alpha`,
//! `numeric`. `min`/`max` compare string length (in chars), array or object
//! length, or numeric value. Fields that are absent are only checked by
//! `required`. The first failing rule per field wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Field name → human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

static NULL: Value = Value::Null;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("email pattern")
});
static ALPHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("alpha pattern"));
static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("digits pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule<'a> {
    Required,
    Email,
    Min(&'a str),
    Max(&'a str),
    In(&'a str),
    Alpha,
    Numeric,
}

impl<'a> Rule<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let (name, param) = match raw.split_once(':') {
            Some((n, p)) => (n, p),
            None => (raw, ""),
        };
        Some(match name {
            "required" => Self::Required,
            "email" => Self::Email,
            "min" => Self::Min(param),
            "max" => Self::Max(param),
            "in" => Self::In(param),
            "alpha" => Self::Alpha,
            "numeric" => Self::Numeric,
            _ => return None,
        })
    }

    fn check(self, value: &Value) -> bool {
        match self {
            Self::Required => is_present(value),
            Self::Email => value.as_str().is_some_and(|s| EMAIL.is_match(s)),
            Self::Min(n) => bound(n).zip(measure(value)).is_some_and(|(n, v)| v >= n),
            Self::Max(n) => bound(n).zip(measure(value)).is_some_and(|(n, v)| v <= n),
            Self::In(options) => {
                let needle = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => return false,
                    other => other.to_string(),
                };
                options.split(',').any(|o| o == needle)
            }
            Self::Alpha => value.as_str().is_some_and(|s| ALPHA.is_match(s)),
            Self::Numeric => match value {
                Value::Number(_) => true,
                Value::String(s) => DIGITS.is_match(s),
                _ => false,
            },
        }
    }

    fn message(self) -> String {
        match self {
            Self::Required => "This field is required.".into(),
            Self::Email => "Please enter a valid email address.".into(),
            Self::Min(n) => format!("This field must be at least {n} characters."),
            Self::Max(n) => format!("This field must be no more than {n} characters."),
            Self::In(_) => "This field contains an invalid value.".into(),
            Self::Alpha => "This field must contain only letters.".into(),
            Self::Numeric => "This field must contain only numbers.".into(),
        }
    }
}

/// Check `data` against `rules`. `Ok(())` when every field passes.
pub fn validate(data: &Value, rules: &[(&str, &[&str])]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    for &(field, field_rules) in rules {
        let value = data.get(field);

        for &raw in field_rules {
            let Some(rule) = Rule::parse(raw) else {
                errors.insert(field.to_owned(), format!("Unknown validation rule: {raw}"));
                break;
            };
            let value = match value {
                Some(v) => v,
                None if rule == Rule::Required => &NULL,
                None => continue,
            };
            if !rule.check(value) {
                errors.insert(field.to_owned(), rule.message());
                break;
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn bound(param: &str) -> Option<f64> {
    param.trim().parse().ok()
}

fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Number(n) => n.as_f64(),
        Value::Array(a) => Some(a.len() as f64),
        Value::Object(o) => Some(o.len() as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passes_valid_input() {
        let body = json!({"username": "alice", "email": "a@example.com", "age": 30});
        let rules: &[(&str, &[&str])] = &[
            ("username", &["required", "min:3", "max:50", "alpha"]),
            ("email", &["required", "email"]),
            ("age", &["numeric", "min:18"]),
        ];
        assert!(validate(&body, rules).is_ok());
    }

    #[test]
    fn first_failing_rule_wins() {
        let body = json!({"username": "ab"});
        let errs = validate(&body, &[("username", &["required", "min:3", "alpha"])]).unwrap_err();
        assert_eq!(errs["username"], "This field must be at least 3 characters.");
    }

    #[test]
    fn missing_required_and_blank_strings() {
        let errs = validate(&json!({"name": "   "}), &[("name", &["required"]), ("sku", &["required"])])
            .unwrap_err();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs["sku"], "This field is required.");
    }

    #[test]
    fn absent_optional_fields_are_skipped() {
        assert!(validate(&json!({}), &[("nickname", &["min:3", "alpha"])]).is_ok());
    }

    #[test]
    fn unknown_rule_is_reported() {
        let errs = validate(&json!({"x": 1}), &[("x", &["uuid"])]).unwrap_err();
        assert_eq!(errs["x"], "Unknown validation rule: uuid");
    }

    #[test]
    fn in_and_numeric() {
        let rules: &[(&str, &[&str])] = &[("role", &["in:admin,viewer"]), ("zip", &["numeric"])];
        assert!(validate(&json!({"role": "viewer", "zip": "02139"}), rules).is_ok());

        let errs = validate(&json!({"role": "root", "zip": "12a"}), rules).unwrap_err();
        assert_eq!(errs["role"], "This field contains an invalid value.");
        assert_eq!(errs["zip"], "This field must contain only numbers.");
    }

    #[test]
    fn numeric_bounds_compare_values() {
        let rules: &[(&str, &[&str])] = &[("price", &["min:0"]), ("qty", &["max:100"])];
        assert!(validate(&json!({"price": 0.0, "qty": 100}), rules).is_ok());
        let errs = validate(&json!({"price": -1.5, "qty": 101}), rules).unwrap_err();
        assert_eq!(errs.len(), 2);
    }
}
