// Rulecheck - declarative validation driven by rule strings
//
// This crate bundles the validation engine with its logging layer so
// applications depend on a single crate.

//! # Rulecheck
//!
//! Fields declare their rules as strings (`"required|min:3|in:a,b"`); a
//! [`Validator`] runs them against an input and reports every failing
//! (field, rule) pair, an overall status, a result code and an info text.
//!
//! ```
//! use rulecheck::prelude::*;
//!
//! struct Login;
//!
//! impl ValidatorDefinition for Login {
//!     fn schema(&self) -> &Schema {
//!         schema! { "username" => "required", "password" => "required|min:8" }
//!     }
//! }
//!
//! let result = validate(&Login, json!({"username": "ann", "password": "short"})).unwrap();
//! assert!(!result.status);
//! assert_eq!(result.message("password", "min"), Some("password must be at least 8"));
//! ```
//!
//! Logging is controlled through `RULECHECK_*` environment variables; see
//! [`log`].

pub use rulecheck_validation::*;

/// Environment-driven logging used by the engine.
pub use rulecheck_log as log;

/// Everything needed to declare and run validators.
pub mod prelude {
    pub use rulecheck_validation::{
        ConfigError, Definition, DefinitionLoader, FileFormat, InputSource, Outcome, Rule,
        RuleArgs, RuleRegistry, RuleSpec, Schema, ValidationPipe, ValidationResult, Validator,
        ValidatorDefinition, schema, validate,
    };
    pub use serde_json::{Value, json};
}
