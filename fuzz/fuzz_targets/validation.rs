//! Fuzz target for validation runs.
//!
//! Built-in rules must never panic, whatever the value or parameters.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rulecheck_validation::{BuiltinRule, Definition, Schema, validate};
use serde_json::{Value, json};

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl FuzzValue {
    fn into_json(self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => json!(b),
            FuzzValue::Int(n) => json!(n),
            FuzzValue::Float(n) => json!(n),
            FuzzValue::Text(s) => json!(s),
            FuzzValue::List(items) => json!(items),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzRun {
    rule: u8,
    params: Vec<String>,
    value: FuzzValue,
}

fuzz_target!(|data: FuzzRun| {
    let rule = BuiltinRule::ALL[data.rule as usize % BuiltinRule::ALL.len()];
    let params: Vec<String> = data
        .params
        .iter()
        .map(|p| p.replace(['|', ':', ','], ""))
        .collect();

    let rules = if params.is_empty() {
        rule.name().to_string()
    } else {
        format!("{}:{}", rule.name(), params.join(","))
    };

    let definition = Definition::new(Schema::builder().field("field", rules).build());
    let result = validate(&definition, json!({"field": data.value.into_json()}))
        .expect("built-in rules always resolve");

    // A failed run always explains itself.
    if !result.status {
        assert!(result.messages.contains_key("field"));
    }
});
