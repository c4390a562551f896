// src/forms.rs
//! Declarative field and form validation plus form serialization.
//!
//! Rules are evaluated per field, in order. Every rule runs; the first
//! failure supplies the message reported for the field. Built-in rules
//! cover the common cases; custom rules are registered by name on a
//! [`ValidatorSet`] and may carry per-rule options and an overriding
//! message.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use url::Url;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+]?[1-9][0-9]{0,15}$").expect("phone regex"));

/// A single validation rule attached to a field.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Non-empty after trimming.
    Required,
    Email,
    Url,
    Phone,
    Number,
    MinLen(usize),
    MaxLen(usize),
    /// A validator registered by name on the [`ValidatorSet`]. An
    /// explicit message overrides whatever the validator reports.
    Custom {
        validator: String,
        message: Option<String>,
        options: Value,
    },
}

impl Rule {
    pub fn custom(validator: &str) -> Self {
        Rule::Custom {
            validator: validator.to_string(),
            message: None,
            options: Value::Null,
        }
    }

    pub fn custom_with(validator: &str, message: Option<&str>, options: Value) -> Self {
        Rule::Custom {
            validator: validator.to_string(),
            message: message.map(String::from),
            options,
        }
    }
}

/// Outcome of one rule: pass, or fail with a message.
pub type RuleOutcome = Result<(), String>;

type ValidatorFn = Box<dyn Fn(&str, &Value) -> RuleOutcome + Send + Sync>;

/// Registry of custom validators, addressed by name from
/// [`Rule::Custom`].
#[derive(Default)]
pub struct ValidatorSet {
    validators: HashMap<String, ValidatorFn>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, validator: F)
    where
        F: Fn(&str, &Value) -> RuleOutcome + Send + Sync + 'static,
    {
        self.validators.insert(name.to_string(), Box::new(validator));
    }

    fn run(&self, name: &str, value: &str, options: &Value) -> RuleOutcome {
        match self.validators.get(name) {
            Some(validator) => validator(value, options),
            None => Err(format!("Unknown validator: {}", name)),
        }
    }
}

fn run_builtin(rule: &Rule, value: &str) -> RuleOutcome {
    match rule {
        Rule::Required => {
            if value.trim().is_empty() {
                Err("This field is required".to_string())
            } else {
                Ok(())
            }
        }
        // Optional-field semantics: empty values pass every rule except
        // `required`.
        _ if value.trim().is_empty() => Ok(()),
        Rule::Email => {
            if EMAIL_RE.is_match(value) {
                Ok(())
            } else {
                Err("Please enter a valid email address".to_string())
            }
        }
        Rule::Url => {
            if Url::parse(value).is_ok() {
                Ok(())
            } else {
                Err("Please enter a valid URL".to_string())
            }
        }
        Rule::Phone => {
            let stripped: String = value
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
                .collect();
            if PHONE_RE.is_match(&stripped) {
                Ok(())
            } else {
                Err("Please enter a valid phone number".to_string())
            }
        }
        Rule::Number => {
            if value.trim().parse::<f64>().is_ok() {
                Ok(())
            } else {
                Err("Please enter a valid number".to_string())
            }
        }
        // Length bounds are in characters, not bytes.
        Rule::MinLen(min) => {
            if value.trim().chars().count() >= *min {
                Ok(())
            } else {
                Err(format!("Must be at least {} characters long", min))
            }
        }
        Rule::MaxLen(max) => {
            if value.trim().chars().count() <= *max {
                Ok(())
            } else {
                Err(format!("Cannot exceed {} characters", max))
            }
        }
        Rule::Custom { .. } => unreachable!("custom rules are dispatched via ValidatorSet"),
    }
}

/// Result of validating one field. Every rule ran; `message` carries the
/// first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    pub valid: bool,
    pub message: Option<String>,
}

impl FieldOutcome {
    fn pass() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }
}

/// Validate a single value against an ordered rule list. All rules run;
/// only the first failing rule's message is reported.
pub fn validate_field(value: &str, rules: &[Rule], validators: &ValidatorSet) -> FieldOutcome {
    let mut first_failure: Option<String> = None;
    for rule in rules {
        let outcome = match rule {
            Rule::Custom {
                validator,
                message,
                options,
            } => {
                if value.trim().is_empty() {
                    Ok(())
                } else {
                    validators
                        .run(validator, value, options)
                        .map_err(|own| message.clone().unwrap_or(own))
                }
            }
            builtin => run_builtin(builtin, value),
        };
        if let Err(message) = outcome {
            first_failure.get_or_insert(message);
        }
    }
    match first_failure {
        Some(message) => FieldOutcome {
            valid: false,
            message: Some(message),
        },
        None => FieldOutcome::pass(),
    }
}

/// Aggregate result across a form. `errors` maps field name to the
/// field's first failing message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: BTreeMap<String, String>,
}

/// Validate only the fields named in the rule map. Missing fields are
/// treated as empty, so a `required` rule still fires for them.
pub fn validate_form(
    data: &FormData,
    rules: &[(&str, Vec<Rule>)],
    validators: &ValidatorSet,
) -> ValidationReport {
    let mut errors = BTreeMap::new();
    for (field, field_rules) in rules {
        let value = data.first(field).unwrap_or_default();
        let outcome = validate_field(&value, field_rules, validators);
        if let Some(message) = outcome.message {
            errors.insert(field.to_string(), message);
        }
    }
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// One serialized field value: scalar for a single occurrence, an
/// ordered list when the name repeats (checkbox groups).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Scalar(String),
    List(Vec<String>),
}

/// Serialized form: field name to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData {
    pub fields: BTreeMap<String, FormValue>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect named (name, value) pairs. Repeated names coalesce into
    /// an ordered list instead of overwriting.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut data = Self::new();
        for (name, value) in pairs {
            data.push(name.into(), value.into());
        }
        data
    }

    pub fn push(&mut self, name: String, value: String) {
        match self.fields.remove(&name) {
            None => {
                self.fields.insert(name, FormValue::Scalar(value));
            }
            Some(FormValue::Scalar(existing)) => {
                self.fields.insert(name, FormValue::List(vec![existing, value]));
            }
            Some(FormValue::List(mut values)) => {
                values.push(value);
                self.fields.insert(name, FormValue::List(values));
            }
        }
    }

    /// First value for a field, scalar or list head.
    pub fn first(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            FormValue::Scalar(value) => Some(value.clone()),
            FormValue::List(values) => values.first().cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy values from `saved` into this form for every field both
    /// sides share (draft restore).
    pub fn restore_from(&mut self, saved: &FormData) {
        for (name, value) in &saved.fields {
            if self.fields.contains_key(name) {
                self.fields.insert(name.clone(), value.clone());
            }
        }
    }
}

/// Clean a comma-separated skills string: trim entries, drop empties,
/// cap list and entry sizes.
pub fn clean_skills_string(skills: &str) -> Result<String, String> {
    let entries: Vec<&str> = skills
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if entries.len() > 50 {
        return Err("Too many skills (maximum 50)".to_string());
    }
    if let Some(long) = entries.iter().find(|s| s.len() > 100) {
        return Err(format!("Skill entry too long: {}", long));
    }
    Ok(entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_validators() -> ValidatorSet {
        ValidatorSet::new()
    }

    #[test]
    fn test_required_rule() {
        let v = no_validators();
        assert!(!validate_field("   ", &[Rule::Required], &v).valid);
        assert!(validate_field("x", &[Rule::Required], &v).valid);
    }

    #[test]
    fn test_email_rule() {
        let v = no_validators();
        for good in ["a@b.co", "first.last@sub.domain.org", "x+tag@y.io"] {
            assert!(validate_field(good, &[Rule::Email], &v).valid, "{}", good);
        }
        for bad in ["plain", "missing@dot", "no at.com", "a@b"] {
            assert!(!validate_field(bad, &[Rule::Email], &v).valid, "{}", bad);
        }
        // Optional-field semantics: empty passes.
        assert!(validate_field("", &[Rule::Email], &v).valid);
    }

    #[test]
    fn test_url_rule() {
        let v = no_validators();
        assert!(validate_field("https://example.com/job", &[Rule::Url], &v).valid);
        assert!(!validate_field("not a url", &[Rule::Url], &v).valid);
    }

    #[test]
    fn test_phone_rule_strips_separators() {
        let v = no_validators();
        assert!(validate_field("+41 (79) 123-45.67", &[Rule::Phone], &v).valid);
        assert!(validate_field("1234567", &[Rule::Phone], &v).valid);
        assert!(!validate_field("0123", &[Rule::Phone], &v).valid);
        assert!(!validate_field("abc", &[Rule::Phone], &v).valid);
    }

    #[test]
    fn test_number_rule() {
        let v = no_validators();
        assert!(validate_field("42", &[Rule::Number], &v).valid);
        assert!(validate_field("-3.5", &[Rule::Number], &v).valid);
        assert!(!validate_field("many", &[Rule::Number], &v).valid);
    }

    #[test]
    fn test_length_rules_count_characters_not_bytes() {
        let v = no_validators();
        // 4 characters, 12 bytes.
        assert!(!validate_field("日本語学", &[Rule::MinLen(5)], &v).valid);
        assert!(validate_field("日本語学校", &[Rule::MinLen(5)], &v).valid);

        let long: String = "語".repeat(1000);
        assert!(validate_field(&long, &[Rule::MaxLen(1000)], &v).valid);
        let too_long: String = "語".repeat(1001);
        assert!(!validate_field(&too_long, &[Rule::MaxLen(1000)], &v).valid);
    }

    #[test]
    fn test_all_rules_run_first_message_wins() {
        let v = no_validators();
        let outcome = validate_field("", &[Rule::Required, Rule::Email], &v);
        assert!(!outcome.valid);
        assert_eq!(outcome.message.as_deref(), Some("This field is required"));

        // Both Email and MinLen fail; the first rule's message is kept.
        let outcome = validate_field("nope", &[Rule::Email, Rule::MinLen(10)], &v);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Please enter a valid email address")
        );
    }

    #[test]
    fn test_custom_validator_and_message_override() {
        let mut v = ValidatorSet::new();
        v.register("uppercase", |value, _| {
            if value.chars().all(|c| !c.is_lowercase()) {
                Ok(())
            } else {
                Err("Must be uppercase".to_string())
            }
        });

        let outcome = validate_field("abc", &[Rule::custom("uppercase")], &v);
        assert_eq!(outcome.message.as_deref(), Some("Must be uppercase"));

        let rule = Rule::custom_with("uppercase", Some("Shout it"), Value::Null);
        let outcome = validate_field("abc", &[rule], &v);
        assert_eq!(outcome.message.as_deref(), Some("Shout it"));

        let outcome = validate_field("ABC", &[Rule::custom("uppercase")], &v);
        assert!(outcome.valid);
    }

    #[test]
    fn test_unknown_validator_fails() {
        let v = no_validators();
        let outcome = validate_field("x", &[Rule::custom("nope")], &v);
        assert_eq!(outcome.message.as_deref(), Some("Unknown validator: nope"));
    }

    #[test]
    fn test_validate_form_collects_actual_messages() {
        let v = no_validators();
        let data = FormData::from_pairs([("company", ""), ("url", "not a url")]);
        let report = validate_form(
            &data,
            &[
                ("company", vec![Rule::Required]),
                ("title", vec![Rule::Required]),
                ("url", vec![Rule::Url]),
            ],
            &v,
        );
        assert!(!report.valid);
        assert_eq!(report.errors["company"], "This field is required");
        assert_eq!(report.errors["title"], "This field is required");
        assert_eq!(report.errors["url"], "Please enter a valid URL");
    }

    #[test]
    fn test_serialization_coalesces_repeated_names() {
        let data = FormData::from_pairs([
            ("company", "Acme"),
            ("perks", "remote"),
            ("perks", "equity"),
        ]);
        assert_eq!(
            data.fields["company"],
            FormValue::Scalar("Acme".to_string())
        );
        assert_eq!(
            data.fields["perks"],
            FormValue::List(vec!["remote".to_string(), "equity".to_string()])
        );

        let json = serde_json::to_string(&data).unwrap();
        let back: FormData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_restore_from_matches_fields_only() {
        let mut form = FormData::from_pairs([("company", ""), ("title", "")]);
        let saved = FormData::from_pairs([("company", "Acme"), ("stray", "x")]);
        form.restore_from(&saved);
        assert_eq!(form.first("company").as_deref(), Some("Acme"));
        assert_eq!(form.first("title").as_deref(), Some(""));
        assert!(form.first("stray").is_none());
    }

    #[test]
    fn test_clean_skills_string() {
        assert_eq!(
            clean_skills_string("Rust,  SQL , ,docker").unwrap(),
            "Rust, SQL, docker"
        );
        let many = vec!["x"; 51].join(",");
        assert!(clean_skills_string(&many).is_err());
    }
}
