// Rule registry

use crate::{BuiltinRule, ConfigError, Result, Rule, RuleArgs, RuleSpec, Schema};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rulecheck_log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a rule instance for one (field, rule) pair.
pub type RuleFactory = Arc<dyn Fn(RuleArgs) -> Box<dyn Rule> + Send + Sync>;

/// Predicate backing a rule registered with [`RuleRegistry::register_fn`].
pub type RulePredicate = Arc<dyn Fn(&Value, &[String]) -> bool + Send + Sync>;

// Copy-on-write: runs take a snapshot, registration swaps in a new version.
static GLOBAL: Lazy<RwLock<Arc<RuleRegistry>>> =
    Lazy::new(|| RwLock::new(Arc::new(RuleRegistry::new())));

/// What a rule name resolves to.
#[derive(Clone)]
pub enum RuleKind {
    Builtin(BuiltinRule),
    Custom(RuleFactory),
}

impl RuleKind {
    /// Bind the rule to one field for one run.
    pub fn instantiate(&self, args: RuleArgs) -> Box<dyn Rule> {
        match self {
            RuleKind::Builtin(rule) => Box::new(rule.bind(args)),
            RuleKind::Custom(factory) => factory(args),
        }
    }
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Builtin(rule) => f.debug_tuple("Builtin").field(rule).finish(),
            RuleKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Mapping from rule name to rule implementation.
///
/// Built-in rules are always present. Custom rules are looked up first, so
/// registering a name that a built-in already uses replaces it for this
/// registry. Lookups are exact and case-sensitive.
///
/// ```
/// use rulecheck_validation::RuleRegistry;
///
/// let mut registry = RuleRegistry::new();
/// registry.register_fn("even", "{FIELD} must be even", |value, _| {
///     value.as_i64().is_some_and(|n| n % 2 == 0)
/// });
///
/// assert!(registry.contains("even"));
/// assert!(registry.contains("required"));
/// assert!(!registry.contains("Even"));
/// ```
#[derive(Clone, Default)]
pub struct RuleRegistry {
    custom: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(RuleArgs) -> Box<dyn Rule> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("registering rule '{}'", name);
        self.custom.insert(name, Arc::new(factory));
        self
    }

    /// Register a rule from a predicate and a default message template.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        default_message: impl Into<String>,
        predicate: F,
    ) -> &mut Self
    where
        F: Fn(&Value, &[String]) -> bool + Send + Sync + 'static,
    {
        let template: Arc<str> = default_message.into().into();
        let predicate: RulePredicate = Arc::new(predicate);
        self.register(name, move |args| {
            Box::new(PredicateRule {
                args,
                template: Arc::clone(&template),
                predicate: Arc::clone(&predicate),
                status: true,
            }) as Box<dyn Rule>
        })
    }

    pub fn resolve(&self, name: &str) -> Option<RuleKind> {
        if let Some(factory) = self.custom.get(name) {
            return Some(RuleKind::Custom(Arc::clone(factory)));
        }
        BuiltinRule::from_name(name).map(RuleKind::Builtin)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name) || BuiltinRule::from_name(name).is_some()
    }

    /// All resolvable names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BuiltinRule::ALL
            .iter()
            .map(|rule| rule.name().to_string())
            .chain(self.custom.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Resolve `spec` for `field`, failing on unknown names.
    pub fn lookup(&self, field: &str, spec: &RuleSpec) -> Result<RuleKind> {
        self.resolve(&spec.name)
            .ok_or_else(|| ConfigError::UnknownRule {
                field: field.to_string(),
                rule: spec.name.clone(),
            })
    }

    /// Check that every rule in `schema` resolves, before any run.
    pub fn verify(&self, schema: &Schema) -> Result<()> {
        for field in schema.fields() {
            for spec in &field.rules {
                self.lookup(&field.name, spec)?;
            }
        }
        Ok(())
    }

    /// Snapshot of the process-wide registry.
    ///
    /// The lock is only held while the snapshot is taken. Runs already in
    /// flight keep the rules they started with; rules registered later are
    /// seen by the next call.
    pub fn global() -> Arc<RuleRegistry> {
        Arc::clone(&*GLOBAL.read())
    }

    pub fn register_global<F>(name: impl Into<String>, factory: F)
    where
        F: Fn(RuleArgs) -> Box<dyn Rule> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut *GLOBAL.write()).register(name, factory);
    }

    pub fn register_global_fn<F>(
        name: impl Into<String>,
        default_message: impl Into<String>,
        predicate: F,
    ) where
        F: Fn(&Value, &[String]) -> bool + Send + Sync + 'static,
    {
        Arc::make_mut(&mut *GLOBAL.write()).register_fn(name, default_message, predicate);
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

/// Rule built from a predicate closure.
struct PredicateRule {
    args: RuleArgs,
    template: Arc<str>,
    predicate: RulePredicate,
    status: bool,
}

impl Rule for PredicateRule {
    fn check(&mut self) {
        self.status = (self.predicate)(&self.args.value, &self.args.params);
    }

    fn status(&self) -> bool {
        self.status
    }

    fn message(&self) -> String {
        let template = self.args.message.as_deref().unwrap_or(&*self.template);
        self.args.render(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AlwaysFails {
        field: String,
    }

    impl Rule for AlwaysFails {
        fn check(&mut self) {}

        fn status(&self) -> bool {
            false
        }

        fn message(&self) -> String {
            format!("{} never passes", self.field)
        }
    }

    #[test]
    fn test_builtins_resolve() {
        let registry = RuleRegistry::new();
        assert!(matches!(
            registry.resolve("required"),
            Some(RuleKind::Builtin(BuiltinRule::Required))
        ));
        assert!(registry.resolve("REQUIRED").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_lookup_unknown_rule() {
        let registry = RuleRegistry::new();
        let err = registry
            .lookup("username", &RuleSpec::parse("requird"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownRule { ref field, ref rule } if field == "username" && rule == "requird"
        ));
    }

    #[test]
    fn test_register_factory() {
        let mut registry = RuleRegistry::new();
        registry.register("never", |args: RuleArgs| {
            Box::new(AlwaysFails { field: args.field }) as Box<dyn Rule>
        });

        let kind = registry.resolve("never").unwrap();
        let mut rule = kind.instantiate(RuleArgs::new("token", json!("abc")));
        rule.check();
        assert!(!rule.status());
        assert_eq!(rule.message(), "token never passes");
    }

    #[test]
    fn test_register_fn_uses_params_and_template() {
        let mut registry = RuleRegistry::new();
        registry.register_fn("starts_with", "{FIELD} must start with {0}", |value, params| {
            value
                .as_str()
                .zip(params.first())
                .is_some_and(|(s, prefix)| s.starts_with(prefix.as_str()))
        });

        let kind = registry.resolve("starts_with").unwrap();
        let args = RuleArgs::new("sku", json!("XY-1")).with_params(["AB"]);
        let mut rule = kind.instantiate(args);
        rule.check();
        assert!(!rule.status());
        assert_eq!(rule.message(), "sku must start with AB");

        let args = RuleArgs::new("sku", json!("AB-1")).with_params(["AB"]);
        let mut rule = kind.instantiate(args);
        rule.check();
        assert!(rule.status());
    }

    #[test]
    fn test_custom_shadows_builtin() {
        let mut registry = RuleRegistry::new();
        registry.register_fn("required", "{FIELD} needs a value", |value, _| !value.is_null());

        let mut rule = registry
            .resolve("required")
            .unwrap()
            .instantiate(RuleArgs::new("age", json!(0)));
        rule.check();
        assert!(rule.status());
    }

    #[test]
    fn test_verify_schema() {
        let registry = RuleRegistry::new();
        let good = Schema::builder().field("name", "required|min:2").build();
        assert!(registry.verify(&good).is_ok());

        let bad = Schema::builder()
            .field("name", "required")
            .field("email", "required|emial")
            .build();
        let err = registry.verify(&bad).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown rule 'emial' declared for field 'email'"
        );
    }

    #[test]
    fn test_names_are_sorted_and_unique() {
        let mut registry = RuleRegistry::new();
        registry.register_fn("aaa", "", |_, _| true);
        registry.register_fn("min", "", |_, _| true);
        let names = registry.names();
        assert_eq!(names.first().map(String::as_str), Some("aaa"));
        assert_eq!(names.iter().filter(|n| *n == "min").count(), 1);
    }
}
