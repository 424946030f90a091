// Validation errors

use std::fmt;
use thiserror::Error;

/// Errors that abort a validation run.
///
/// A value failing a rule is never one of these: that outcome is reported
/// through [`ValidationResult`](crate::ValidationResult). Only broken
/// configuration (typos in rule names, unreadable definition files) or
/// unusable input stops a run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown rule '{rule}' declared for field '{field}'")]
    UnknownRule { field: String, rule: String },

    #[error("Failed to load definition: {0}")]
    LoadError(String),

    #[error("Failed to parse definition: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// A single failed (field, rule) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field name that failed validation
    pub field: String,

    /// Rendered message
    pub message: String,

    /// Rule name that failed
    pub constraint: String,

    /// Offending value, when it renders as text
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: "custom".to_string(),
            value: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.field, self.constraint, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Flat list of failures, e.g. for an HTTP error body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Errors recorded for one field, in execution order
    pub fn get_field_errors(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "errors": self.errors.iter().map(|e| {
                serde_json::json!({
                    "field": e.field,
                    "message": e.message,
                    "constraint": e.constraint,
                    "value": e.value,
                })
            }).collect::<Vec<_>>()
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}
