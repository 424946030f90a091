// Validator definitions

use crate::{InputSource, Schema};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Code reported when per-field rules failed (and the default failure code).
pub const DEFAULT_FAILED_CODE: i32 = -1;

/// Code reported by the default post-check when everything passed.
pub const DEFAULT_SUCCEED_CODE: i32 = -2;

pub const DEFAULT_FAILED_INFO: &str = "data is invalid";

pub const DEFAULT_SUCCEED_INFO: &str = "data is valid";

/// Failure messages keyed by field, then rule name, in execution order.
pub type Messages = IndexMap<String, IndexMap<String, String>>;

/// Status and code of a run, handed to [`ValidatorDefinition::check`].
///
/// The post-check only ever sees an outcome whose field rules all passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    status: bool,
    code: i32,
    messages: Messages,
}

impl Outcome {
    pub(crate) fn new(code: i32) -> Self {
        Self {
            status: true,
            code,
            messages: Messages::new(),
        }
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Mark the run as passed with `code`.
    pub fn succeed(&mut self, code: i32) {
        self.status = true;
        self.code = code;
    }

    /// Mark the run as failed with `code`.
    pub fn fail_with(&mut self, code: i32) {
        self.status = false;
        self.code = code;
    }

    pub fn set_code(&mut self, code: i32) {
        self.code = code;
    }

    /// Record a failure message. The per-field map is created on first use.
    pub fn add_message(
        &mut self,
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.messages
            .entry(field.into())
            .or_default()
            .insert(rule.into(), message.into());
    }

    /// Record a rule failure: status goes false and stays false.
    pub(crate) fn record_failure(&mut self, field: &str, rule: &str, message: String) {
        self.status = false;
        self.add_message(field, rule, message);
    }

    pub(crate) fn into_parts(self) -> (bool, i32, Messages) {
        (self.status, self.code, self.messages)
    }
}

/// Per-field, per-rule message templates overriding rule defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOverrides {
    templates: HashMap<String, HashMap<String, String>>,
}

impl MessageOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        mut self,
        field: impl Into<String>,
        rule: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.insert(field, rule, template);
        self
    }

    pub fn insert(
        &mut self,
        field: impl Into<String>,
        rule: impl Into<String>,
        template: impl Into<String>,
    ) {
        self.templates
            .entry(field.into())
            .or_default()
            .insert(rule.into(), template.into());
    }

    pub fn get(&self, field: &str, rule: &str) -> Option<&str> {
        self.templates
            .get(field)
            .and_then(|rules| rules.get(rule))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// The declarative side of a validator.
///
/// Only [`schema`](Self::schema) is required. Implementors should return a
/// schema built once per type (see [`schema!`](crate::schema!)) rather than
/// building one per call.
///
/// ```
/// use rulecheck_validation::{schema, Schema, ValidatorDefinition};
///
/// struct Login;
///
/// impl ValidatorDefinition for Login {
///     fn schema(&self) -> &Schema {
///         schema! { "username" => "required", "password" => "required|min:8" }
///     }
/// }
/// ```
pub trait ValidatorDefinition {
    /// Declared fields and their rules.
    fn schema(&self) -> &Schema;

    /// Override template for `(field, rule)`, if any.
    fn message_override(&self, _field: &str, _rule: &str) -> Option<&str> {
        None
    }

    /// Human-readable text for an application-defined result code.
    fn info(&self, _code: i32) -> Option<&str> {
        None
    }

    fn failed_code(&self) -> i32 {
        DEFAULT_FAILED_CODE
    }

    fn succeed_code(&self) -> i32 {
        DEFAULT_SUCCEED_CODE
    }

    fn failed_info(&self) -> &str {
        DEFAULT_FAILED_INFO
    }

    fn succeed_info(&self) -> &str {
        DEFAULT_SUCCEED_INFO
    }

    /// Whole-object check, run once and only when every field rule passed.
    ///
    /// The default marks the run as succeeded with the success code.
    fn check(&self, _input: &dyn InputSource, outcome: &mut Outcome) {
        outcome.succeed(self.succeed_code());
    }

    /// Info text for a final code.
    fn resolve_info(&self, code: i32) -> String {
        if code == self.succeed_code() {
            self.succeed_info().to_string()
        } else if code == self.failed_code() {
            self.failed_info().to_string()
        } else {
            self.info(code).unwrap_or_default().to_string()
        }
    }
}

impl<D: ValidatorDefinition + ?Sized> ValidatorDefinition for &D {
    fn schema(&self) -> &Schema {
        (**self).schema()
    }

    fn message_override(&self, field: &str, rule: &str) -> Option<&str> {
        (**self).message_override(field, rule)
    }

    fn info(&self, code: i32) -> Option<&str> {
        (**self).info(code)
    }

    fn failed_code(&self) -> i32 {
        (**self).failed_code()
    }

    fn succeed_code(&self) -> i32 {
        (**self).succeed_code()
    }

    fn failed_info(&self) -> &str {
        (**self).failed_info()
    }

    fn succeed_info(&self) -> &str {
        (**self).succeed_info()
    }

    fn check(&self, input: &dyn InputSource, outcome: &mut Outcome) {
        (**self).check(input, outcome)
    }
}

impl<D: ValidatorDefinition + ?Sized> ValidatorDefinition for Arc<D> {
    fn schema(&self) -> &Schema {
        (**self).schema()
    }

    fn message_override(&self, field: &str, rule: &str) -> Option<&str> {
        (**self).message_override(field, rule)
    }

    fn info(&self, code: i32) -> Option<&str> {
        (**self).info(code)
    }

    fn failed_code(&self) -> i32 {
        (**self).failed_code()
    }

    fn succeed_code(&self) -> i32 {
        (**self).succeed_code()
    }

    fn failed_info(&self) -> &str {
        (**self).failed_info()
    }

    fn succeed_info(&self) -> &str {
        (**self).succeed_info()
    }

    fn check(&self, input: &dyn InputSource, outcome: &mut Outcome) {
        (**self).check(input, outcome)
    }
}

/// Hook signature used by [`Definition`] for its post-check.
pub type CheckFn = Arc<dyn Fn(&dyn InputSource, &mut Outcome) + Send + Sync>;

/// An owned validator definition, built in code or loaded from a file.
#[derive(Clone)]
pub struct Definition {
    pub(crate) schema: Schema,
    pub(crate) messages: MessageOverrides,
    pub(crate) info: HashMap<i32, String>,
    pub(crate) failed_code: i32,
    pub(crate) succeed_code: i32,
    pub(crate) failed_info: String,
    pub(crate) succeed_info: String,
    pub(crate) check: Option<CheckFn>,
}

impl Definition {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            messages: MessageOverrides::default(),
            info: HashMap::new(),
            failed_code: DEFAULT_FAILED_CODE,
            succeed_code: DEFAULT_SUCCEED_CODE,
            failed_info: DEFAULT_FAILED_INFO.to_string(),
            succeed_info: DEFAULT_SUCCEED_INFO.to_string(),
            check: None,
        }
    }

    pub fn with_messages(mut self, messages: MessageOverrides) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_message(
        mut self,
        field: impl Into<String>,
        rule: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.messages.insert(field, rule, template);
        self
    }

    pub fn with_info(mut self, code: i32, text: impl Into<String>) -> Self {
        self.info.insert(code, text.into());
        self
    }

    pub fn with_codes(mut self, failed: i32, succeed: i32) -> Self {
        self.failed_code = failed;
        self.succeed_code = succeed;
        self
    }

    pub fn with_default_info(mut self, failed: impl Into<String>, succeed: impl Into<String>) -> Self {
        self.failed_info = failed.into();
        self.succeed_info = succeed.into();
        self
    }

    /// Replace the default post-check.
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&dyn InputSource, &mut Outcome) + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("schema", &self.schema)
            .field("messages", &self.messages)
            .field("info", &self.info)
            .field("failed_code", &self.failed_code)
            .field("succeed_code", &self.succeed_code)
            .field("custom_check", &self.check.is_some())
            .finish()
    }
}

impl ValidatorDefinition for Definition {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn message_override(&self, field: &str, rule: &str) -> Option<&str> {
        self.messages.get(field, rule)
    }

    fn info(&self, code: i32) -> Option<&str> {
        self.info.get(&code).map(String::as_str)
    }

    fn failed_code(&self) -> i32 {
        self.failed_code
    }

    fn succeed_code(&self) -> i32 {
        self.succeed_code
    }

    fn failed_info(&self) -> &str {
        &self.failed_info
    }

    fn succeed_info(&self) -> &str {
        &self.succeed_info
    }

    fn check(&self, input: &dyn InputSource, outcome: &mut Outcome) {
        match &self.check {
            Some(check) => check(input, outcome),
            None => outcome.succeed(self.succeed_code),
        }
    }
}
