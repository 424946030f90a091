// Validation engine

use crate::{
    ConfigError, FieldPlan, InputSource, Messages, Outcome, Result, RuleArgs, RuleRegistry,
    ValidationError, ValidationErrors, ValidatorDefinition,
};
use indexmap::IndexMap;
use rulecheck_log::{debug, trace, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// The result of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// `false` if any rule failed or the post-check rejected the input
    pub status: bool,

    /// Sentinel or application-defined result code
    pub code: i32,

    /// Every failed (field, rule) pair and its message
    pub messages: Messages,

    /// Text describing `code`
    pub info: String,

    /// Value of each field that failed a rule, as the rules saw it
    #[serde(skip)]
    values: IndexMap<String, Value>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.status
    }

    /// Message for one failed (field, rule) pair.
    pub fn message(&self, field: &str, rule: &str) -> Option<&str> {
        self.messages
            .get(field)
            .and_then(|rules| rules.get(rule))
            .map(String::as_str)
    }

    /// Value a failed field had during the run.
    ///
    /// Fields that only appear through the post-check have no entry.
    pub fn failed_value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Flatten `messages` into one record per failure.
    ///
    /// Scalar values are attached as text; arrays, objects and absent
    /// values are left out.
    pub fn errors(&self) -> ValidationErrors {
        self.messages
            .iter()
            .flat_map(|(field, rules)| {
                let value = self.values.get(field).and_then(value_text);
                rules.iter().map(move |(rule, message)| {
                    let error = ValidationError::new(field.clone(), message.clone())
                        .with_constraint(rule.clone());
                    match &value {
                        Some(text) => error.with_value(text.clone()),
                        None => error,
                    }
                })
            })
            .collect::<Vec<_>>()
            .into()
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "code": self.code,
            "messages": self.messages,
            "info": self.info,
        })
    }

    /// `(status, code, messages, info)`
    pub fn into_parts(self) -> (bool, i32, Messages, String) {
        (self.status, self.code, self.messages, self.info)
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Runs a definition's rules against one input.
///
/// The validator owns its input; rules only ever see copies of field
/// values, so the caller's data is never touched. Each call to
/// [`validate`](Self::validate) is an independent run.
///
/// ```
/// use rulecheck_validation::{schema, Schema, Validator, ValidatorDefinition};
/// use serde_json::json;
///
/// struct Signup;
///
/// impl ValidatorDefinition for Signup {
///     fn schema(&self) -> &Schema {
///         schema! { "username" => "required", "age" => "required" }
///     }
/// }
///
/// let result = Validator::new(&Signup, json!({"username": "bob", "age": 0}))
///     .validate()
///     .unwrap();
///
/// assert!(!result.status);
/// assert_eq!(result.message("age", "required"), Some("age is required"));
/// assert!(result.messages.get("username").is_none());
/// ```
pub struct Validator<'d, D: ?Sized, S> {
    definition: &'d D,
    input: S,
    registry: Option<Arc<RuleRegistry>>,
    default: Value,
}

impl<'d, D, S> Validator<'d, D, S>
where
    D: ValidatorDefinition + ?Sized,
    S: InputSource,
{
    pub fn new(definition: &'d D, input: S) -> Self {
        Self {
            definition,
            input,
            registry: None,
            default: Value::Null,
        }
    }

    /// Resolve rules from `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<RuleRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Value used for fields the input does not contain. Defaults to `null`.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn input(&self) -> &S {
        &self.input
    }

    /// Field plans for a run against the current input.
    pub fn plan(&self) -> Vec<FieldPlan> {
        self.definition.schema().plan(&self.input, &self.default)
    }

    /// Run every rule, then the post-check if nothing failed.
    ///
    /// Returns `Err` only for configuration problems such as an unknown
    /// rule name; failing rules are reported in the result.
    pub fn validate(&self) -> Result<ValidationResult> {
        match &self.registry {
            Some(registry) => self.run(registry),
            None => self.run(&RuleRegistry::global()),
        }
    }

    fn run(&self, registry: &RuleRegistry) -> Result<ValidationResult> {
        let definition = self.definition;
        let plans = self.plan();
        trace!("validating {} fields", plans.len());

        let mut outcome = Outcome::new(definition.failed_code());
        let mut values = IndexMap::new();
        for plan in plans {
            self.run_field(registry, plan, &mut outcome, &mut values)?;
        }

        if outcome.status() {
            debug!("all field rules passed, running post-check");
            definition.check(&self.input, &mut outcome);
        }

        let (status, code, messages) = outcome.into_parts();
        let info = definition.resolve_info(code);
        trace!(
            "validation finished: status={} code={} failed_fields={}",
            status,
            code,
            messages.len()
        );

        Ok(ValidationResult {
            status,
            code,
            messages,
            info,
            values,
        })
    }

    fn run_field(
        &self,
        registry: &RuleRegistry,
        plan: FieldPlan,
        outcome: &mut Outcome,
        values: &mut IndexMap<String, Value>,
    ) -> Result<()> {
        for spec in &plan.rules {
            let kind = registry.lookup(&plan.field, spec).inspect_err(|err| {
                warn!("{}", err);
            })?;

            let mut args = RuleArgs::new(plan.field.clone(), plan.value.clone())
                .with_params(spec.params.iter().cloned());
            if let Some(template) = self.definition.message_override(&plan.field, &spec.name) {
                args = args.with_message(template);
            }

            let mut rule = kind.instantiate(args);
            rule.check();
            if !rule.status() {
                let message = rule.message();
                debug!("{}.{} failed: {}", plan.field, spec.name, message);
                outcome.record_failure(&plan.field, &spec.name, message);
                if !values.contains_key(&plan.field) {
                    values.insert(plan.field.clone(), plan.value.clone());
                }
            }
        }
        Ok(())
    }
}

/// Shorthand for a run where only configuration errors matter to `?`.
pub fn validate<D, S>(definition: &D, input: S) -> std::result::Result<ValidationResult, ConfigError>
where
    D: ValidatorDefinition + ?Sized,
    S: InputSource,
{
    Validator::new(definition, input).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Definition, Schema, DEFAULT_FAILED_CODE, DEFAULT_SUCCEED_CODE};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn definition(fields: &[(&str, &str)]) -> Definition {
        let schema = fields
            .iter()
            .fold(Schema::builder(), |b, (field, rules)| b.field(*field, *rules))
            .build();
        Definition::new(schema)
    }

    #[test]
    fn test_required_empty_string() {
        let definition = definition(&[("username", "required")]);
        let result = validate(&definition, json!({"username": ""})).unwrap();

        assert!(!result.status);
        assert_eq!(result.code, DEFAULT_FAILED_CODE);
        assert_eq!(result.info, "data is invalid");
        assert_eq!(
            result.to_json()["messages"],
            json!({"username": {"required": "username is required"}})
        );
    }

    #[test]
    fn test_only_failing_field_reported() {
        let definition = definition(&[("username", "required"), ("age", "required")]);
        let result = validate(&definition, json!({"username": "bob", "age": 0})).unwrap();

        assert!(!result.status);
        assert_eq!(
            result.to_json()["messages"],
            json!({"age": {"required": "age is required"}})
        );
    }

    #[test]
    fn test_only_failing_rule_reported() {
        let definition = definition(&[("username", "required|min:5")]);
        let result = validate(&definition, json!({"username": "bob"})).unwrap();

        assert_eq!(
            result.to_json()["messages"],
            json!({"username": {"min": "username must be at least 5"}})
        );
    }

    #[test]
    fn test_all_failures_collected() {
        let definition = definition(&[("username", "required|min:3"), ("email", "required|email")]);
        let result = validate(&definition, json!({})).unwrap();

        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages["username"].len(), 2);
        assert_eq!(result.messages["email"].len(), 2);
        assert_eq!(result.errors().len(), 4);

        let fields: Vec<_> = result.messages.keys().cloned().collect();
        assert_eq!(fields, vec!["username", "email"]);
    }

    #[test]
    fn test_success_runs_default_check() {
        let definition = definition(&[("username", "required")]);
        let result = validate(&definition, json!({"username": "bob"})).unwrap();

        assert!(result.is_valid());
        assert_eq!(result.code, DEFAULT_SUCCEED_CODE);
        assert_eq!(result.info, "data is valid");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_field_without_rules_never_fails() {
        let definition = definition(&[("notes", ""), ("name", "required")]);
        for notes in [json!(null), json!(""), json!(0), json!("text")] {
            let result = validate(&definition, json!({"notes": notes, "name": "x"})).unwrap();
            assert!(result.status);
            assert!(result.messages.get("notes").is_none());
        }
    }

    #[test]
    fn test_post_check_skipped_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let definition = definition(&[("username", "required")]).with_check(move |_, outcome| {
            seen.fetch_add(1, Ordering::SeqCst);
            outcome.succeed(DEFAULT_SUCCEED_CODE);
        });

        let result = validate(&definition, json!({"username": ""})).unwrap();
        assert!(!result.status);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = validate(&definition, json!({"username": "bob"})).unwrap();
        assert!(result.status);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_post_check_decides_outcome() {
        let definition = definition(&[("password", "required"), ("confirm", "required")])
            .with_info(1001, "passwords do not match")
            .with_check(|input, outcome| {
                let password = input.get("password", Value::Null);
                let confirm = input.get("confirm", Value::Null);
                if password == confirm {
                    outcome.succeed(DEFAULT_SUCCEED_CODE);
                } else {
                    outcome.fail_with(1001);
                    outcome.add_message("confirm", "same", "confirm must match password");
                }
            });

        let result = validate(&definition, json!({"password": "a", "confirm": "b"})).unwrap();
        assert!(!result.status);
        assert_eq!(result.code, 1001);
        assert_eq!(result.info, "passwords do not match");
        assert_eq!(result.message("confirm", "same"), Some("confirm must match password"));

        let result = validate(&definition, json!({"password": "a", "confirm": "a"})).unwrap();
        assert!(result.status);
        assert_eq!(result.info, "data is valid");
    }

    #[test]
    fn test_post_check_may_register_global_rules() {
        let definition = definition(&[("a", "required")]).with_check(|_, outcome| {
            RuleRegistry::register_global_fn(
                "registered_by_check",
                "{FIELD} must be positive",
                |value, _| value.as_f64().is_some_and(|n| n > 0.0),
            );
            outcome.succeed(DEFAULT_SUCCEED_CODE);
        });

        let result = validate(&definition, json!({"a": 1})).unwrap();
        assert!(result.status);

        let later = self::definition(&[("n", "registered_by_check")]);
        assert!(validate(&later, json!({"n": 3})).unwrap().status);
        let result = validate(&later, json!({"n": -3})).unwrap();
        assert_eq!(result.message("n", "registered_by_check"), Some("n must be positive"));
    }

    #[test]
    fn test_errors_carry_failed_values() {
        let definition = definition(&[
            ("name", "min:3"),
            ("age", "between:18,99"),
            ("tags", "max:1"),
            ("missing", "required"),
        ]);
        let result = validate(
            &definition,
            json!({"name": "al", "age": 7, "tags": ["a", "b"]}),
        )
        .unwrap();

        assert_eq!(result.failed_value("tags"), Some(&json!(["a", "b"])));
        assert_eq!(result.failed_value("missing"), Some(&Value::Null));

        let errors = result.errors();
        let value_of = |field: &str| errors.get_field_errors(field)[0].value.clone();
        assert_eq!(value_of("name"), Some("al".to_string()));
        assert_eq!(value_of("age"), Some("7".to_string()));
        assert_eq!(value_of("tags"), None);
        assert_eq!(value_of("missing"), None);
        assert_eq!(errors.to_json()["errors"][0]["value"], json!("al"));
    }

    #[test]
    fn test_unknown_code_has_empty_info() {
        let definition = definition(&[("a", "required")]).with_check(|_, outcome| outcome.set_code(42));
        let result = validate(&definition, json!({"a": 1})).unwrap();
        assert!(result.status);
        assert_eq!(result.code, 42);
        assert_eq!(result.info, "");
    }

    #[test]
    fn test_unknown_rule_aborts_run() {
        let definition = definition(&[("username", "required|requird")]);
        let err = validate(&definition, json!({"username": "bob"})).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { ref rule, .. } if rule == "requird"));
    }

    #[test]
    fn test_trailing_pipe_is_a_configuration_error() {
        let definition = definition(&[("username", "required|")]);
        let err = validate(&definition, json!({"username": "bob"})).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { ref rule, .. } if rule.is_empty()));
    }

    #[test]
    fn test_message_override() {
        let definition = definition(&[("username", "required|min:3")])
            .with_message("username", "required", "Please choose a {FIELD}")
            .with_message("username", "min", "At least {0} characters");

        let result = validate(&definition, json!({})).unwrap();
        assert_eq!(result.message("username", "required"), Some("Please choose a username"));
        assert_eq!(result.message("username", "min"), Some("At least 3 characters"));
    }

    #[test]
    fn test_local_registry() {
        let mut registry = RuleRegistry::new();
        registry.register_fn("even", "{FIELD} must be even", |value, _| {
            value.as_i64().is_some_and(|n| n % 2 == 0)
        });
        let registry = Arc::new(registry);
        let definition = definition(&[("count", "required|even")]);

        let result = Validator::new(&definition, json!({"count": 3}))
            .with_registry(Arc::clone(&registry))
            .validate()
            .unwrap();
        assert_eq!(result.message("count", "even"), Some("count must be even"));

        // The process-wide registry does not know the rule.
        assert!(validate(&definition, json!({"count": 3})).is_err());
    }

    #[test]
    fn test_default_for_missing_fields() {
        let definition = definition(&[("nickname", "in:anon,")]);

        let result = validate(&definition, json!({})).unwrap();
        assert!(result.status);

        let result = Validator::new(&definition, json!({}))
            .with_default(json!("ghost"))
            .validate()
            .unwrap();
        assert!(!result.status);
    }

    #[test]
    fn test_input_is_not_mutated_and_runs_are_independent() {
        let definition = definition(&[("name", "required")]);
        let mut input = HashMap::new();
        input.insert("name".to_string(), json!(""));

        let validator = Validator::new(&definition, input.clone());
        let first = validator.validate().unwrap();
        let second = validator.validate().unwrap();

        assert_eq!(first, second);
        assert_eq!(validator.input(), &input);
    }

    #[test]
    fn test_plan_reflects_input() {
        let definition = definition(&[("name", "required|min:2"), ("age", "")]);
        let validator = Validator::new(&definition, json!({"name": "al"}));
        let plans = validator.plan();

        assert_eq!(plans[0].value, json!("al"));
        assert_eq!(plans[0].rules.len(), 2);
        assert_eq!(plans[1].value, Value::Null);
        assert!(plans[1].rules.is_empty());
    }

    #[test]
    fn test_into_parts() {
        let definition = definition(&[("a", "required")]);
        let (status, code, messages, info) = validate(&definition, json!({"a": "x"}))
            .unwrap()
            .into_parts();
        assert!(status);
        assert_eq!(code, DEFAULT_SUCCEED_CODE);
        assert!(messages.is_empty());
        assert_eq!(info, "data is valid");
    }
}
