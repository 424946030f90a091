//! Fuzz target for definition file loading.
//!
//! Malformed documents must surface as errors, never panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rulecheck_validation::{DefinitionLoader, FileFormat, ValidatorDefinition};

fuzz_target!(|data: &str| {
    for format in [FileFormat::Json, FileFormat::Toml] {
        if let Ok(definition) = DefinitionLoader::new(format).parse(data) {
            // Loaded fields always pass the discovery filter.
            for field in definition.schema().fields() {
                assert!(!field.name.starts_with("__"));
            }
        }
    }
});
