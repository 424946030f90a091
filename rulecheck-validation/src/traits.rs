// Validation traits

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Anything a validator can pull field values from.
///
/// The engine only ever asks for a flat value by name; there are no
/// nested paths and no coercion at this level.
pub trait InputSource {
    /// Value stored under `field`, or `default` when it is absent.
    fn get(&self, field: &str, default: Value) -> Value;
}

impl InputSource for HashMap<String, Value> {
    fn get(&self, field: &str, default: Value) -> Value {
        HashMap::get(self, field).cloned().unwrap_or(default)
    }
}

impl InputSource for BTreeMap<String, Value> {
    fn get(&self, field: &str, default: Value) -> Value {
        BTreeMap::get(self, field).cloned().unwrap_or(default)
    }
}

impl InputSource for HashMap<String, String> {
    fn get(&self, field: &str, default: Value) -> Value {
        HashMap::get(self, field)
            .map(|s| Value::String(s.clone()))
            .unwrap_or(default)
    }
}

impl InputSource for Map<String, Value> {
    fn get(&self, field: &str, default: Value) -> Value {
        Map::get(self, field).cloned().unwrap_or(default)
    }
}

/// Objects are looked up by key; any other JSON value has no fields.
impl InputSource for Value {
    fn get(&self, field: &str, default: Value) -> Value {
        match self {
            Value::Object(map) => InputSource::get(map, field, default),
            _ => default,
        }
    }
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn get(&self, field: &str, default: Value) -> Value {
        (**self).get(field, default)
    }
}

/// Everything a rule is constructed from.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleArgs {
    /// Field being validated, substituted for `{FIELD}`
    pub field: String,

    /// The field's value for this run
    pub value: Value,

    /// Parameters as written in the rule string
    pub params: Vec<String>,

    /// Per-field, per-rule override of the default template
    pub message: Option<String>,
}

impl RuleArgs {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
            params: Vec::new(),
            message: None,
        }
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Render `template` against this invocation.
    ///
    /// Supports `{FIELD}`, `{PARAMS}` (comma-joined) and positional
    /// `{0}`, `{1}`, ... placeholders. Unknown placeholders are left as is.
    pub fn render(&self, template: &str) -> String {
        let mut out = template.replace("{FIELD}", &self.field);
        if out.contains("{PARAMS}") {
            out = out.replace("{PARAMS}", &self.params.join(", "));
        }
        for (index, param) in self.params.iter().enumerate() {
            let placeholder = format!("{{{}}}", index);
            if out.contains(&placeholder) {
                out = out.replace(&placeholder, param);
            }
        }
        out
    }
}

/// One rule bound to one field for one run.
///
/// A rule starts out passing; `check` may flip its status. `check` must not
/// panic for any value: values a rule cannot interpret count as a failure,
/// ideally with a message saying why.
pub trait Rule: Send {
    /// Evaluate the rule against the bound value.
    fn check(&mut self);

    /// `true` until `check` proves otherwise.
    fn status(&self) -> bool;

    /// Message describing the failure, with placeholders already filled in.
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hashmap_source() {
        let mut data = HashMap::new();
        data.insert("name".to_string(), json!("bob"));

        assert_eq!(InputSource::get(&data, "name", Value::Null), json!("bob"));
        assert_eq!(InputSource::get(&data, "age", json!("")), json!(""));
    }

    #[test]
    fn test_string_map_source() {
        let mut data = HashMap::new();
        data.insert("age".to_string(), "42".to_string());

        assert_eq!(InputSource::get(&data, "age", Value::Null), json!("42"));
        assert_eq!(InputSource::get(&data, "name", Value::Null), Value::Null);
    }

    #[test]
    fn test_json_value_source() {
        let data = json!({"tags": ["a", "b"], "age": 0});
        assert_eq!(InputSource::get(&data, "tags", Value::Null), json!(["a", "b"]));
        assert_eq!(InputSource::get(&data, "age", Value::Null), json!(0));

        let scalar = json!("not an object");
        assert_eq!(InputSource::get(&scalar, "age", json!(1)), json!(1));
    }

    #[test]
    fn test_render_placeholders() {
        let args = RuleArgs::new("age", json!(3)).with_params(["18", "99"]);
        assert_eq!(
            args.render("{FIELD} must be between {0} and {1}"),
            "age must be between 18 and 99"
        );
        assert_eq!(args.render("{FIELD}: {PARAMS}"), "age: 18, 99");
        assert_eq!(args.render("{FIELD} {2}"), "age {2}");
    }
}
