// Built-in rules

use crate::{Rule, RuleArgs};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("email pattern compiles")
});

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("url pattern compiles"));

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern compiles")
});

static ALPHA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").expect("alpha pattern compiles"));

static ALPHANUMERIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("alphanumeric pattern compiles"));

static NUMERIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("numeric pattern compiles"));

/// Most distinct `regex:` sources kept compiled at once. A full cache is
/// emptied before the next insert.
const USER_PATTERN_CAPACITY: usize = 256;

// Patterns from `regex:` rules. `None` marks a source that failed to compile.
static USER_PATTERNS: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[cfg(test)]
pub(crate) fn cached_pattern_count() -> usize {
    USER_PATTERNS.read().len()
}

// ============================================================================
// Value coercion
// ============================================================================

/// Truthiness of a JSON value.
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are falsy; everything else is
/// truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Scalar values as text. `null` reads as the empty string.
fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => Some(Cow::Borrowed("")),
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Size used by `min`/`max`/`between`: numeric value, character count,
/// or element count.
fn size_of(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        Value::Bool(_) => None,
    }
}

// ============================================================================
// Rule kinds
// ============================================================================

/// Outcome of evaluating a built-in rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// The rule could not interpret its parameters or the value. Carries a
    /// message template used instead of the rule's default.
    Invalid(String),
}

/// The rules every registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRule {
    Required,
    Min,
    Max,
    Between,
    In,
    NotIn,
    Email,
    Url,
    Uuid,
    Alpha,
    AlphaNum,
    Numeric,
    Regex,
}

impl BuiltinRule {
    pub const ALL: [BuiltinRule; 13] = [
        BuiltinRule::Required,
        BuiltinRule::Min,
        BuiltinRule::Max,
        BuiltinRule::Between,
        BuiltinRule::In,
        BuiltinRule::NotIn,
        BuiltinRule::Email,
        BuiltinRule::Url,
        BuiltinRule::Uuid,
        BuiltinRule::Alpha,
        BuiltinRule::AlphaNum,
        BuiltinRule::Numeric,
        BuiltinRule::Regex,
    ];

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinRule::Required => "required",
            BuiltinRule::Min => "min",
            BuiltinRule::Max => "max",
            BuiltinRule::Between => "between",
            BuiltinRule::In => "in",
            BuiltinRule::NotIn => "not_in",
            BuiltinRule::Email => "email",
            BuiltinRule::Url => "url",
            BuiltinRule::Uuid => "uuid",
            BuiltinRule::Alpha => "alpha",
            BuiltinRule::AlphaNum => "alpha_num",
            BuiltinRule::Numeric => "numeric",
            BuiltinRule::Regex => "regex",
        }
    }

    /// Message template used when the definition has no override.
    pub fn default_message(&self) -> &'static str {
        match self {
            BuiltinRule::Required => "{FIELD} is required",
            BuiltinRule::Min => "{FIELD} must be at least {0}",
            BuiltinRule::Max => "{FIELD} must be at most {0}",
            BuiltinRule::Between => "{FIELD} must be between {0} and {1}",
            BuiltinRule::In => "{FIELD} must be one of: {PARAMS}",
            BuiltinRule::NotIn => "{FIELD} must not be one of: {PARAMS}",
            BuiltinRule::Email => "{FIELD} must be a valid email",
            BuiltinRule::Url => "{FIELD} must be a valid URL",
            BuiltinRule::Uuid => "{FIELD} must be a valid UUID",
            BuiltinRule::Alpha => "{FIELD} must contain only letters",
            BuiltinRule::AlphaNum => "{FIELD} must contain only letters and numbers",
            BuiltinRule::Numeric => "{FIELD} must contain only numbers",
            BuiltinRule::Regex => "{FIELD} does not match the required pattern",
        }
    }

    /// Evaluate this rule. Never panics.
    pub fn evaluate(&self, value: &Value, params: &[String]) -> Verdict {
        match self {
            BuiltinRule::Required => verdict(is_truthy(value)),
            BuiltinRule::Min => bound(self, value, params, |size, limit| size >= limit),
            BuiltinRule::Max => bound(self, value, params, |size, limit| size <= limit),
            BuiltinRule::Between => between(value, params),
            BuiltinRule::In => membership(value, params, true),
            BuiltinRule::NotIn => membership(value, params, false),
            BuiltinRule::Email => pattern(&EMAIL_REGEX, value),
            BuiltinRule::Url => pattern(&URL_REGEX, value),
            BuiltinRule::Uuid => pattern(&UUID_REGEX, value),
            BuiltinRule::Alpha => pattern(&ALPHA_REGEX, value),
            BuiltinRule::AlphaNum => pattern(&ALPHANUMERIC_REGEX, value),
            BuiltinRule::Numeric => pattern(&NUMERIC_REGEX, value),
            BuiltinRule::Regex => user_pattern(value, params),
        }
    }

    /// Bind this rule to one field for one run.
    pub fn bind(self, args: RuleArgs) -> BuiltinCheck {
        BuiltinCheck {
            kind: self,
            args,
            status: true,
            diagnostic: None,
        }
    }
}

fn verdict(passed: bool) -> Verdict {
    if passed { Verdict::Pass } else { Verdict::Fail }
}

fn number_param(rule: &str, raw: Option<&String>) -> Result<f64, Verdict> {
    let raw = raw.map(String::as_str).unwrap_or_default();
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(Verdict::Invalid(format!(
            "{{FIELD}}: rule '{}' expects a numeric parameter, got '{}'",
            rule, raw
        ))),
    }
}

fn measure(value: &Value) -> Result<f64, Verdict> {
    size_of(value).ok_or_else(|| Verdict::Invalid("{FIELD} has no measurable size".to_string()))
}

fn bound(rule: &BuiltinRule, value: &Value, params: &[String], ok: fn(f64, f64) -> bool) -> Verdict {
    let limit = match number_param(rule.name(), params.first()) {
        Ok(limit) => limit,
        Err(invalid) => return invalid,
    };
    match measure(value) {
        Ok(size) => verdict(ok(size, limit)),
        Err(invalid) => invalid,
    }
}

fn between(value: &Value, params: &[String]) -> Verdict {
    let limits = number_param("between", params.first())
        .and_then(|lo| number_param("between", params.get(1)).map(|hi| (lo, hi)));
    let (lo, hi) = match limits {
        Ok(limits) => limits,
        Err(invalid) => return invalid,
    };
    match measure(value) {
        Ok(size) => verdict(size >= lo && size <= hi),
        Err(invalid) => invalid,
    }
}

fn membership(value: &Value, params: &[String], wanted: bool) -> Verdict {
    match as_text(value) {
        Some(text) => verdict(params.iter().any(|p| *p == text) == wanted),
        None => single_value_required(),
    }
}

fn pattern(regex: &Regex, value: &Value) -> Verdict {
    match as_text(value) {
        Some(text) => verdict(regex.is_match(&text)),
        None => single_value_required(),
    }
}

fn single_value_required() -> Verdict {
    Verdict::Invalid("{FIELD} must be a single value".to_string())
}

fn user_pattern(value: &Value, params: &[String]) -> Verdict {
    let source = params.join(",");
    let Some(text) = as_text(value) else {
        return single_value_required();
    };

    let cached = USER_PATTERNS
        .read()
        .get(&source)
        .map(|entry| entry.as_ref().map(|r| r.is_match(&text)));
    let matched = match cached {
        Some(matched) => matched,
        None => {
            let compiled = Regex::new(&source).ok();
            let matched = compiled.as_ref().map(|r| r.is_match(&text));
            let mut cache = USER_PATTERNS.write();
            if cache.len() >= USER_PATTERN_CAPACITY {
                cache.clear();
            }
            cache.insert(source, compiled);
            matched
        }
    };

    match matched {
        Some(passed) => verdict(passed),
        None => Verdict::Invalid(
            "{FIELD}: rule 'regex' was given an invalid pattern".to_string(),
        ),
    }
}

// ============================================================================
// Bound instances
// ============================================================================

/// A built-in rule bound to a field, value and parameters.
#[derive(Debug, Clone)]
pub struct BuiltinCheck {
    kind: BuiltinRule,
    args: RuleArgs,
    status: bool,
    diagnostic: Option<String>,
}

impl BuiltinCheck {
    pub fn kind(&self) -> BuiltinRule {
        self.kind
    }
}

impl Rule for BuiltinCheck {
    fn check(&mut self) {
        match self.kind.evaluate(&self.args.value, &self.args.params) {
            Verdict::Pass => self.status = true,
            Verdict::Fail => self.status = false,
            Verdict::Invalid(diagnostic) => {
                self.status = false;
                self.diagnostic = Some(diagnostic);
            }
        }
    }

    fn status(&self) -> bool {
        self.status
    }

    fn message(&self) -> String {
        let template = self
            .diagnostic
            .as_deref()
            .or(self.args.message.as_deref())
            .unwrap_or(self.kind.default_message());
        self.args.render(template)
    }
}
