use crate::error::ValidationErrors;
use serde::de::DeserializeOwned;

/// Kind of configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Float,
    String,
    Object,
}

/// Description of a bound config field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name in the struct
    pub name: &'static str,
    /// Optional env var overriding the field
    pub env: Option<&'static str>,
    /// Fully-qualified dotted path of the key serde reads (e.g. `database.url`).
    pub path: &'static str,
    /// Kind of value exposed by this field.
    pub kind: Kind,
    /// Default literal, if any.
    pub default: Option<&'static str>,
    /// Whether this field was declared as required.
    pub required: bool,
}

/// Binding description of a configuration struct.
///
/// Usually produced by `#[derive(AppConfig)]`; it tells the loader which file
/// to read, which defaults sit underneath the file, which fields an
/// environment variable may override and which paths must be present.
pub trait ConfigMeta: Validate + DeserializeOwned {
    /// File name looked up in the configuration directories.
    ///
    /// Defaults to the type name in kebab-case plus `.conf`, so
    /// `SampleConfig` reads `sample-config.conf`.
    fn file_name() -> String {
        crate::util::default_file_name::<Self>()
    }

    /// JSON object containing defaults for each field.
    fn defaults_json() -> serde_json::Value;

    /// Metadata about all fields in the struct.
    fn field_specs() -> &'static [FieldSpec];

    /// Which fields are required, as dotted paths.
    fn required_fields() -> &'static [&'static str];
}

/// Trait implemented by config structs that support runtime validation.
///
/// The derive macro `#[derive(AppConfig)]` will auto-generate
/// an implementation based on attributes like `#[appconfig(validate(...))]`.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

impl FieldSpec {
    /// Produce a copy of this spec with `prefix.` applied to the path.
    pub fn with_prefix(&self, prefix: &'static str) -> Self {
        let combined_path = crate::util::leak_string(format!("{prefix}.{}", self.path));
        Self {
            path: combined_path,
            ..self.clone()
        }
    }

    /// Return dotted path segments for this field.
    pub fn segments(&self) -> Vec<&'static str> {
        self.path.split('.').collect()
    }
}
