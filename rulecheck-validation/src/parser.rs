// Rule-string parsing
//
//   rule_string := segment ('|' segment)*
//   segment     := name (':' param (',' param)*)?
//
// There is no escaping for '|', ':' or ','.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One parsed rule invocation, e.g. `in:a,b,c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule name, trimmed. Empty for malformed segments.
    pub name: String,

    /// Parameters in declaration order, each trimmed.
    pub params: Vec<String>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Parse a single segment.
    ///
    /// Everything after the first `:` is the parameter section. A segment
    /// without `:` still carries one empty parameter, and extra colons are
    /// dropped with the pieces around them glued together:
    ///
    /// ```
    /// use rulecheck_validation::RuleSpec;
    ///
    /// assert_eq!(RuleSpec::parse("required").params, vec![""]);
    /// assert_eq!(RuleSpec::parse("in: a , b").params, vec!["a", "b"]);
    /// assert_eq!(RuleSpec::parse("regex:^a:b$").params, vec!["^ab$"]);
    /// ```
    pub fn parse(segment: &str) -> Self {
        let mut pieces = segment.split(':').map(str::trim);
        let name = pieces.next().unwrap_or_default().to_string();
        let section: String = pieces.collect();

        let params = section
            .split(',')
            .map(|param| param.trim().to_string())
            .collect();

        Self { name, params }
    }

    /// Parse a full rule string into its segments, in order.
    pub fn parse_all(rules: &str) -> Vec<Self> {
        rules.split('|').map(Self::parse).collect()
    }

    /// Parameters with the placeholder empty entry removed.
    ///
    /// `required` and `required:` both report no meaningful parameters.
    pub fn meaningful_params(&self) -> &[String] {
        match self.params.as_slice() {
            [only] if only.is_empty() => &[],
            params => params,
        }
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.meaningful_params().is_empty() {
            write!(f, ":{}", self.params.join(","))?;
        }
        Ok(())
    }
}

impl From<&str> for RuleSpec {
    fn from(segment: &str) -> Self {
        Self::parse(segment)
    }
}
