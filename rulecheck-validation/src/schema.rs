// Schema declaration and per-run planning

use crate::{InputSource, RuleSpec};
use indexmap::IndexMap;
use serde_json::Value;

/// Attribute names starting with this prefix are internal, never fields.
pub const RESERVED_PREFIX: &str = "__";

/// One declared field and its parsed rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    /// The rule string as declared
    pub source: String,
    pub rules: Vec<RuleSpec>,
}

impl FieldDecl {
    fn new(name: String, source: String) -> Self {
        // An empty declaration constrains nothing; anything else is parsed
        // as is, so stray '|' still produce empty (unknown) rule names.
        let rules = if source.trim().is_empty() {
            Vec::new()
        } else {
            RuleSpec::parse_all(&source)
        };
        Self {
            name,
            source,
            rules,
        }
    }
}

/// A field's value and rules for a single validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub field: String,
    pub value: Value,
    pub rules: Vec<RuleSpec>,
}

/// The declared fields of a validator, in declaration order.
///
/// Rule strings are parsed once when the schema is built. Build a schema
/// once per validator type, e.g. with [`schema!`](crate::schema!), and hand
/// out the same reference on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDecl>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Whether an attribute counts as a field declaration: its value is a
    /// string and its name is not reserved.
    pub fn is_declaration(name: &str, value: &Value) -> bool {
        value.is_string() && !name.starts_with(RESERVED_PREFIX)
    }

    /// Build a schema from arbitrary named attributes, keeping only the
    /// ones that are declarations.
    ///
    /// ```
    /// use rulecheck_validation::Schema;
    /// use serde_json::json;
    ///
    /// let schema = Schema::discover([
    ///     ("username", json!("required")),
    ///     ("__module__", json!("forms")),
    ///     ("retries", json!(3)),
    /// ]);
    /// assert_eq!(schema.len(), 1);
    /// assert!(schema.get("username").is_some());
    /// ```
    pub fn discover<I, K>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        attrs
            .into_iter()
            .fold(Self::builder(), |builder, (name, value)| {
                let name = name.into();
                if !Self::is_declaration(&name, &value) {
                    return builder;
                }
                match value {
                    Value::String(rules) => builder.field(name, rules),
                    _ => builder,
                }
            })
            .build()
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field name to rule string, as declared.
    pub fn declarations(&self) -> IndexMap<&str, &str> {
        self.fields
            .iter()
            .map(|field| (field.name.as_str(), field.source.as_str()))
            .collect()
    }

    /// Resolve every field's current value from `source`.
    ///
    /// Absent fields get `default`. Plans are built fresh for each run.
    pub fn plan(&self, source: &dyn InputSource, default: &Value) -> Vec<FieldPlan> {
        self.fields
            .iter()
            .map(|field| FieldPlan {
                field: field.name.clone(),
                value: source.get(&field.name, default.clone()),
                rules: field.rules.clone(),
            })
            .collect()
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDecl>,
}

impl SchemaBuilder {
    /// Declare `name` with a rule string such as `"required|min:3"`.
    ///
    /// Declaring the same field again replaces its rules but keeps its
    /// original position.
    pub fn field(mut self, name: impl Into<String>, rules: impl Into<String>) -> Self {
        let decl = FieldDecl::new(name.into(), rules.into());
        match self.fields.iter_mut().find(|field| field.name == decl.name) {
            Some(existing) => *existing = decl,
            None => self.fields.push(decl),
        }
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

/// Declare a schema that is built on first use and cached for the rest of
/// the process. Each invocation site owns its own cache, so calling it from
/// a validator's `schema` method gives one schema per validator type.
///
/// ```
/// use rulecheck_validation::{schema, Schema};
///
/// fn signup_schema() -> &'static Schema {
///     schema! {
///         "username" => "required|min:3",
///         "email" => "required|email",
///     }
/// }
///
/// assert!(std::ptr::eq(signup_schema(), signup_schema()));
/// assert_eq!(signup_schema().len(), 2);
/// ```
#[macro_export]
macro_rules! schema {
    ($($field:expr => $rules:expr),* $(,)?) => {{
        static SCHEMA: $crate::__private::Lazy<$crate::Schema> =
            $crate::__private::Lazy::new(|| {
                $crate::Schema::builder()
                    $(.field($field, $rules))*
                    .build()
            });
        &*SCHEMA
    }};
}
