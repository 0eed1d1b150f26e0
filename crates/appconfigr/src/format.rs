//! Data formats a configuration document can be written in.
//!
//! Every format parses into the same [`ConfigNode`](crate::ConfigNode) tree, so
//! merging and binding never see the difference.

use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// The data format used for every file an [`AppConfigr`](crate::AppConfigr) reads.
///
/// File names do not decide the format: `sample-config.conf` is YAML unless
/// the builder selects something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Cargo feature gating this format.
    pub fn feature(self) -> &'static str {
        match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Toml => "toml",
        }
    }

    /// Parse `text` into a tree. `path` is only used for error context.
    ///
    /// A blank document yields an empty mapping.
    pub fn parse(self, path: &Path, text: &str) -> Result<Value, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        match self {
            Format::Yaml => parse_yaml(path, text),
            Format::Json => parse_json(path, text),
            Format::Toml => parse_toml(path, text),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Yaml => "YAML",
            Format::Json => "JSON",
            Format::Toml => "TOML",
        };
        f.write_str(name)
    }
}

fn parse_error<E>(format: Format, path: &Path, err: E) -> ConfigError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ConfigError::Parse {
        format,
        path: path.to_path_buf(),
        source: Box::new(err),
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(path: &Path, text: &str) -> Result<Value, ConfigError> {
    serde_yaml::from_str(text).map_err(|e| parse_error(Format::Yaml, path, e))
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(_path: &Path, _text: &str) -> Result<Value, ConfigError> {
    Err(ConfigError::FormatDisabled(Format::Yaml))
}

#[cfg(feature = "json")]
fn parse_json(path: &Path, text: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(text).map_err(|e| parse_error(Format::Json, path, e))
}

#[cfg(not(feature = "json"))]
fn parse_json(_path: &Path, _text: &str) -> Result<Value, ConfigError> {
    Err(ConfigError::FormatDisabled(Format::Json))
}

#[cfg(feature = "toml")]
fn parse_toml(path: &Path, text: &str) -> Result<Value, ConfigError> {
    let t: toml::Value = toml::from_str(text).map_err(|e| parse_error(Format::Toml, path, e))?;
    serde_json::to_value(t).map_err(|e| parse_error(Format::Toml, path, e))
}

#[cfg(not(feature = "toml"))]
fn parse_toml(_path: &Path, _text: &str) -> Result<Value, ConfigError> {
    Err(ConfigError::FormatDisabled(Format::Toml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(format: Format, text: &str) -> Result<Value, ConfigError> {
        format.parse(Path::new("test.conf"), text)
    }

    #[test]
    fn yaml_is_the_default() {
        assert_eq!(Format::default(), Format::Yaml);
    }

    #[test]
    fn parses_each_format_into_the_same_tree() {
        let expected = json!({ "name": "svc", "port": 8080, "tags": ["a", "b"] });

        let yaml = parse(Format::Yaml, "name: svc\nport: 8080\ntags: [a, b]\n").unwrap();
        let json = parse(Format::Json, r#"{"name":"svc","port":8080,"tags":["a","b"]}"#).unwrap();
        let toml = parse(Format::Toml, "name = \"svc\"\nport = 8080\ntags = [\"a\", \"b\"]\n").unwrap();

        assert_eq!(yaml, expected);
        assert_eq!(json, expected);
        assert_eq!(toml, expected);
    }

    #[test]
    fn blank_document_is_an_empty_mapping() {
        assert_eq!(parse(Format::Yaml, "  \n\n").unwrap(), json!({}));
        assert_eq!(parse(Format::Json, "").unwrap(), json!({}));
    }

    #[test]
    fn syntax_errors_carry_format_and_path() {
        let err = parse(Format::Json, "{ not json").unwrap_err();
        match err {
            ConfigError::Parse { format, path, .. } => {
                assert_eq!(format, Format::Json);
                assert_eq!(path, Path::new("test.conf"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
