// Validation pipe for JSON payloads

use crate::{ConfigError, Result, ValidationResult, Validator, ValidatorDefinition};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Validates raw JSON payloads and batches of inputs.
pub struct ValidationPipe;

impl ValidationPipe {
    /// Parse a request body into a flat JSON object.
    pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>> {
        match serde_json::from_slice(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ConfigError::InvalidInput(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
            Err(e) => Err(ConfigError::InvalidInput(format!("Invalid JSON: {}", e))),
        }
    }

    /// Parse `body` and validate it against `definition`.
    pub fn validate_json<D>(definition: &D, body: &[u8]) -> Result<ValidationResult>
    where
        D: ValidatorDefinition + ?Sized,
    {
        let input = Self::parse_body(body)?;
        Validator::new(definition, input).validate()
    }

    /// Validate many inputs concurrently, one validator per input.
    ///
    /// Results come back in input order. Each task owns its input, so no
    /// state is shared between runs beyond the read-only definition and
    /// rule registry.
    ///
    /// ```no_run
    /// # use rulecheck_validation::*;
    /// # use std::sync::Arc;
    /// # async fn example() -> Result<()> {
    /// let definition = Arc::new(Definition::new(
    ///     Schema::builder().field("email", "required|email").build(),
    /// ));
    /// let inputs = vec![
    ///     serde_json::json!({"email": "a@example.com"}),
    ///     serde_json::json!({"email": "nope"}),
    /// ];
    ///
    /// let results = ValidationPipe::validate_parallel(definition, inputs).await?;
    /// assert!(results[0].status);
    /// assert!(!results[1].status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn validate_parallel<D>(
        definition: Arc<D>,
        inputs: Vec<Value>,
    ) -> Result<Vec<ValidationResult>>
    where
        D: ValidatorDefinition + Send + Sync + 'static,
    {
        use tokio::task::JoinSet;

        let mut set = JoinSet::new();
        for (index, input) in inputs.into_iter().enumerate() {
            let definition = Arc::clone(&definition);
            set.spawn(async move {
                let result = Validator::new(&*definition, input).validate();
                (index, result)
            });
        }

        let mut results: Vec<Option<ValidationResult>> = Vec::new();
        results.resize_with(set.len(), || None);

        while let Some(joined) = set.join_next().await {
            let (index, result) = joined.map_err(|e| ConfigError::TaskFailed(e.to_string()))?;
            results[index] = Some(result?);
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Error body for a failed result, one entry per failed (field, rule).
    pub fn error_body(result: &ValidationResult) -> Value {
        let mut body = result.errors().to_json();
        body["code"] = Value::from(result.code);
        body["info"] = Value::from(result.info.clone());
        body
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate an input and propagate configuration errors with `?`.
///
/// Expands to the [`ValidationResult`]; rule failures stay in the result.
#[macro_export]
macro_rules! validate {
    ($definition:expr, $input:expr) => {{
        $crate::validate(&$definition, $input)?
    }};
}
