//! Declarative validation driven by rule strings
//!
//! A validator declares, per field, a pipe-separated list of rules such as
//! `"required|min:3|in:a,b,c"`. The engine parses the declarations once,
//! runs every rule against the input, and reports each failing
//! (field, rule) pair along with an overall status, result code and info
//! text.
//!
//! # Examples
//!
//! ## Declaring a validator
//!
//! ```
//! use rulecheck_validation::{schema, Schema, Validator, ValidatorDefinition};
//! use serde_json::json;
//!
//! struct Signup;
//!
//! impl ValidatorDefinition for Signup {
//!     fn schema(&self) -> &Schema {
//!         schema! {
//!             "username" => "required|min:3",
//!             "role" => "in:admin,member",
//!         }
//!     }
//!
//!     fn message_override(&self, field: &str, rule: &str) -> Option<&str> {
//!         match (field, rule) {
//!             ("username", "min") => Some("{FIELD} needs {0}+ characters"),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let result = Validator::new(&Signup, json!({"username": "al", "role": "member"}))
//!     .validate()
//!     .unwrap();
//!
//! assert!(!result.status);
//! assert_eq!(result.message("username", "min"), Some("username needs 3+ characters"));
//! assert_eq!(result.info, "data is invalid");
//! ```
//!
//! ## Parsing rule strings
//!
//! ```
//! use rulecheck_validation::RuleSpec;
//!
//! let specs = RuleSpec::parse_all("required|between:1,10");
//! assert_eq!(specs[1].name, "between");
//! assert_eq!(specs[1].params, vec!["1", "10"]);
//! ```
//!
//! ## Custom rules
//!
//! ```
//! use rulecheck_validation::{Definition, RuleRegistry, Schema, Validator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut registry = RuleRegistry::new();
//! registry.register_fn("lowercase", "{FIELD} must be lowercase", |value, _| {
//!     value.as_str().is_some_and(|s| s == s.to_lowercase())
//! });
//!
//! let definition = Definition::new(Schema::builder().field("slug", "required|lowercase").build());
//! let result = Validator::new(&definition, json!({"slug": "Hello"}))
//!     .with_registry(Arc::new(registry))
//!     .validate()
//!     .unwrap();
//!
//! assert_eq!(result.message("slug", "lowercase"), Some("slug must be lowercase"));
//! ```

mod definition;
mod engine;
mod errors;
mod loader;
mod parser;
mod pipe;
mod rules;
mod schema;
mod traits;
mod validators;

pub use definition::*;
pub use engine::*;
pub use errors::*;
pub use loader::*;
pub use parser::*;
pub use pipe::*;
pub use rules::*;
pub use schema::*;
pub use traits::*;
pub use validators::*;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
