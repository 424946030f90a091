//! Fuzz target for rule-string parsing.
//!
//! Parsing must accept any text and keep the segment structure intact.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rulecheck_validation::{RuleRegistry, RuleSpec, Schema};

fuzz_target!(|data: &str| {
    let specs = RuleSpec::parse_all(data);

    // One spec per '|' segment, never zero.
    assert_eq!(specs.len(), data.split('|').count());

    for spec in &specs {
        assert!(!spec.name.contains(':'));
        assert_eq!(spec.name, spec.name.trim());
        assert!(!spec.params.is_empty());
        for param in &spec.params {
            assert_eq!(param, param.trim());
            assert!(!param.contains(','));
        }
    }

    // Resolution either succeeds or reports the offending rule.
    let schema = Schema::builder().field("field", data).build();
    let _ = RuleRegistry::new().verify(&schema);
});
