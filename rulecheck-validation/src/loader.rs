// Definition file loaders

use crate::{ConfigError, Definition, MessageOverrides, Result, Schema};
use indexmap::IndexMap;
use rulecheck_log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Supported definition file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// On-disk shape of a validator definition.
///
/// ```toml
/// failed_code = -1
///
/// [fields]
/// username = "required|min:3"
/// age = "required|between:18,130"
///
/// [messages.username]
/// required = "Pick a {FIELD}"
///
/// [info]
/// 1001 = "account locked"
/// ```
///
/// Entries of `fields` go through the same filter as
/// [`Schema::discover`]: non-string values and `__`-prefixed names are
/// ignored, so a file can carry comments such as `__note = "..."`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionFile {
    pub fields: IndexMap<String, Value>,
    pub messages: HashMap<String, HashMap<String, String>>,
    pub info: HashMap<String, String>,
    pub failed_code: Option<i32>,
    pub succeed_code: Option<i32>,
    pub failed_info: Option<String>,
    pub succeed_info: Option<String>,
}

impl DefinitionFile {
    pub fn into_definition(self) -> Result<Definition> {
        let schema = Schema::discover(self.fields);

        let mut messages = MessageOverrides::new();
        for (field, rules) in self.messages {
            for (rule, template) in rules {
                messages.insert(field.clone(), rule, template);
            }
        }

        let mut definition = Definition::new(schema).with_messages(messages);
        for (code, text) in self.info {
            let code = code.trim().parse::<i32>().map_err(|_| {
                ConfigError::ParseError(format!("info key '{}' is not an integer code", code))
            })?;
            definition = definition.with_info(code, text);
        }

        if let Some(code) = self.failed_code {
            definition.failed_code = code;
        }
        if let Some(code) = self.succeed_code {
            definition.succeed_code = code;
        }
        if let Some(text) = self.failed_info {
            definition.failed_info = text;
        }
        if let Some(text) = self.succeed_info {
            definition.succeed_info = text;
        }

        Ok(definition)
    }
}

/// Definition file loader
pub struct DefinitionLoader {
    format: FileFormat,
}

impl DefinitionLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Definition> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let definition = self.parse(&content)?;
        debug!(
            "loaded definition with {} fields from {}",
            definition.schema.len(),
            path.display()
        );
        Ok(definition)
    }

    pub fn parse(&self, content: &str) -> Result<Definition> {
        self.parse_file(content)?.into_definition()
    }

    /// Parse without converting, e.g. to inspect or re-serialize a file.
    pub fn parse_file(&self, content: &str) -> Result<DefinitionFile> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e))),
        }
    }
}

impl Definition {
    /// Load a definition, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        DefinitionLoader::auto(path)?.load_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidatorDefinition;

    const TOML_DEFINITION: &str = r#"
succeed_code = 0
succeed_info = "ok"

[fields]
username = "required|min:3"
__note = "not a field"
retries = 3
email = "email"

[messages.username]
required = "Pick a {FIELD}"

[info]
1001 = "account locked"
"#;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_auto_requires_known_extension() {
        assert!(DefinitionLoader::auto("rules.toml").is_ok());
        assert!(matches!(
            DefinitionLoader::auto("rules"),
            Err(ConfigError::LoadError(_))
        ));
        assert!(matches!(
            DefinitionLoader::auto("rules.ini"),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_parse_toml() {
        let definition = DefinitionLoader::new(FileFormat::Toml)
            .parse(TOML_DEFINITION)
            .unwrap();

        let names: Vec<_> = definition
            .schema()
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert!(names.contains(&"username"));
        assert!(names.contains(&"email"));
        assert_eq!(names.len(), 2);

        assert_eq!(
            definition.message_override("username", "required"),
            Some("Pick a {FIELD}")
        );
        assert_eq!(definition.info(1001), Some("account locked"));
        assert_eq!(definition.succeed_code(), 0);
        assert_eq!(definition.resolve_info(0), "ok");
        assert_eq!(definition.failed_code(), -1);
    }

    #[test]
    fn test_parse_json_keeps_field_order() {
        let json = r#"{
            "fields": {"b": "required", "a": "required", "__doc__": "x", "c": "min:1"},
            "info": {"7": "seven"}
        }"#;
        let definition = DefinitionLoader::new(FileFormat::Json).parse(json).unwrap();

        let names: Vec<_> = definition
            .schema()
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(definition.info(7), Some("seven"));
    }

    #[test]
    fn test_bad_info_key() {
        let json = r#"{"fields": {}, "info": {"seven": "x"}}"#;
        let err = DefinitionLoader::new(FileFormat::Json).parse(json).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_malformed_content() {
        let err = DefinitionLoader::new(FileFormat::Json)
            .parse("{not json")
            .unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));

        let err = DefinitionLoader::new(FileFormat::Toml)
            .parse("[fields\nname = ")
            .unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_load_file_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "rulecheck-loader-{}.toml",
            std::process::id()
        ));
        fs::write(&path, TOML_DEFINITION).unwrap();

        let definition = Definition::from_file(&path).unwrap();
        assert_eq!(definition.schema().len(), 2);

        fs::remove_file(&path).unwrap();
        assert!(matches!(
            Definition::from_file(&path),
            Err(ConfigError::LoadError(_))
        ));
    }
}
