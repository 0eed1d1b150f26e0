use crate::error::{ConfigError, Issue, IssueKind, ValidationErrors};
use crate::format::Format;
use crate::merge::{insert_path, lookup, lookup_mut, merge};
use crate::resolver::{EnvResolver, Properties, VariableResolver};
use crate::types::{ConfigMeta, Kind};
use crate::variables;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::env;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const DEFAULT_SUB_DIRECTORY: &str = "config";

/// Access point for all configuration files in a directory.
///
/// Create one through [`AppConfigr::from_directory`] or
/// [`AppConfigr::from_default_directory`], then request configurations by type
/// or by file name.
pub struct AppConfigr {
    base: PathBuf,
    overlays: Vec<PathBuf>,
    format: Format,
    resolver: Box<dyn VariableResolver>,
    check_pending: bool,
}

impl fmt::Debug for AppConfigr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfigr")
            .field("base", &self.base)
            .field("overlays", &self.overlays)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl AppConfigr {
    /// Start building an instance that looks up files in `path`.
    pub fn from_directory(path: impl Into<PathBuf>) -> Builder {
        Builder::new(path.into())
    }

    /// Start building an instance rooted at `<current dir>/config`.
    pub fn from_default_directory() -> Result<Builder, ConfigError> {
        let cwd = env::current_dir().map_err(ConfigError::CurrentDir)?;
        Ok(Self::from_directory(cwd.join(DEFAULT_SUB_DIRECTORY)))
    }

    /// Base directory.
    pub fn directory(&self) -> &Path {
        &self.base
    }

    /// Overlay directories, lowest precedence first.
    pub fn overlays(&self) -> &[PathBuf] {
        &self.overlays
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Load `name` from the base directory and every overlay directory that
    /// has it, with variables substituted, merged in directory order.
    ///
    /// Variables are substituted after parsing, inside string values only.
    pub fn document(&self, name: &str) -> Result<Value, ConfigError> {
        if self.check_pending && !self.base.is_dir() {
            return Err(ConfigError::NotADirectory(self.base.clone()));
        }

        let mut searched = Vec::with_capacity(1 + self.overlays.len());
        let mut merged: Option<Value> = None;

        for dir in std::iter::once(&self.base).chain(&self.overlays) {
            let path = dir.join(name);
            searched.push(path.clone());
            if !path.is_file() {
                debug!(path = %path.display(), "no configuration file here");
                continue;
            }

            let node = self.read_file(&path)?;
            debug!(path = %path.display(), format = %self.format, "loaded configuration file");
            match merged.as_mut() {
                Some(acc) => merge(acc, node),
                None => merged = Some(node),
            }
        }

        merged.ok_or_else(|| ConfigError::NotFound {
            name: name.to_string(),
            searched,
        })
    }

    /// Bind `name` onto any deserializable type. No defaults, overrides,
    /// coercion or validation are applied; values bind as written, so a
    /// substituted `${PORT}` stays a string.
    pub fn bind<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let node = self.document(name)?;
        serde_json::from_value(node).map_err(|source| ConfigError::Bind {
            name: name.to_string(),
            source,
        })
    }

    /// Load `T` from the file its type name maps to.
    pub fn config<T: ConfigMeta>(&self) -> Result<T, ConfigError> {
        self.config_named(&T::file_name())
    }

    /// Load `T` from `name`.
    pub fn config_named<T: ConfigMeta>(&self, name: &str) -> Result<T, ConfigError> {
        let document = self.document(name)?;
        assemble(name, document)
    }

    /// Run the `config_named` pipeline on a document held in memory.
    ///
    /// `name` labels the document in errors and logs. The directories are not
    /// consulted.
    pub fn config_from_str<T: ConfigMeta>(&self, name: &str, text: &str) -> Result<T, ConfigError> {
        let document = self.parse_document(Path::new(name), text)?;
        assemble(name, document)
    }

    /// Like [`config_from_str`](AppConfigr::config_from_str), reading the
    /// document from `reader` first.
    pub fn config_from_reader<T: ConfigMeta, R: Read>(
        &self,
        name: &str,
        mut reader: R,
    ) -> Result<T, ConfigError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| ConfigError::Io {
                path: PathBuf::from(name),
                source,
            })?;
        self.config_from_str(name, &text)
    }

    fn read_file(&self, path: &Path) -> Result<Value, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_document(path, &raw)
    }

    fn parse_document(&self, path: &Path, text: &str) -> Result<Value, ConfigError> {
        let mut node = self.format.parse(path, text)?;
        variables::substitute_node(&mut node, self.resolver.as_ref())?;
        Ok(node)
    }
}

/// Configures an [`AppConfigr`] before use.
pub struct Builder {
    path: PathBuf,
    check_directory: bool,
    format: Format,
    overlays: Vec<PathBuf>,
    properties: Properties,
    dotenv: Option<PathBuf>,
    resolver: Option<Box<dyn VariableResolver>>,
}

impl Builder {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            check_directory: true,
            format: Format::default(),
            overlays: Vec::new(),
            properties: Properties::new(),
            dotenv: None,
            resolver: None,
        }
    }

    /// Suppress the is-a-directory check in [`build`](Builder::build). The
    /// check then happens when the first configuration is requested.
    pub fn no_check(mut self) -> Self {
        self.check_directory = false;
        self
    }

    /// Replace the data format used for every file. YAML by default.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Add a directory whose files override those of the base directory and
    /// of previously added overlays. Missing overlay directories are skipped.
    pub fn overlay_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.overlays.push(path.into());
        self
    }

    /// Set a property, consulted before the environment when resolving
    /// `${NAME}` references.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Seed properties from a `.env` file, read at build time. Values given
    /// through [`property`](Builder::property) take precedence.
    pub fn dotenv_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    /// Replace the whole resolver chain (properties, then environment).
    pub fn resolver(mut self, resolver: impl VariableResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn build(self) -> Result<AppConfigr, ConfigError> {
        if self.check_directory && !self.path.is_dir() {
            return Err(ConfigError::NotADirectory(self.path));
        }

        let resolver = match self.resolver {
            Some(custom) => custom,
            None => {
                let mut props = match &self.dotenv {
                    Some(path) => Properties::from_dotenv(path)?,
                    None => Properties::new(),
                };
                props.extend(self.properties);
                Box::new(props.with_fallback(EnvResolver)) as Box<dyn VariableResolver>
            }
        };

        debug!(
            directory = %self.path.display(),
            overlays = self.overlays.len(),
            format = %self.format,
            "configuration loader ready"
        );

        Ok(AppConfigr {
            base: self.path,
            overlays: self.overlays,
            format: self.format,
            resolver,
            check_pending: !self.check_directory,
        })
    }
}

fn assemble<T: ConfigMeta>(name: &str, document: Value) -> Result<T, ConfigError> {
    // 1. Start with defaults.
    let mut acc = T::defaults_json();

    // 2. Overlay the document.
    merge(&mut acc, document);

    // 3. Overlay environment variables bound to fields.
    apply_environment::<T>(&mut acc)?;

    // 4. Check required fields on the assembled value before deserializing.
    let mut errs = ValidationErrors::new();
    check_required::<T>(&acc, &mut errs);
    if !errs.is_empty() {
        return Err(ConfigError::Validation(errs));
    }

    // 5. Coerce scalars to the declared field kinds, then deserialize.
    coerce_scalars::<T>(&mut acc);
    let cfg: T = serde_json::from_value(acc).map_err(|source| ConfigError::Bind {
        name: name.to_string(),
        source,
    })?;

    // 6. Run declared validations.
    cfg.validate()?;

    debug!(config = name, "configuration bound and validated");
    Ok(cfg)
}

fn apply_environment<T: ConfigMeta>(root: &mut Value) -> Result<(), ConfigError> {
    for spec in T::field_specs() {
        if let Some(env_name) = spec.env {
            if let Ok(val) = env::var(env_name) {
                let parsed = parse_literal(&val, spec.kind).map_err(|message| ConfigError::Env {
                    var: env_name.to_string(),
                    message,
                })?;
                debug!(var = env_name, path = spec.path, "environment override applied");
                insert_path(root, &spec.segments(), parsed);
            }
        }
    }
    Ok(())
}

/// Convert scalars whose type disagrees with the field kind: numeric or
/// boolean strings for number and bool fields, numbers and bools for string
/// fields. Values that do not convert are left for serde to report.
fn coerce_scalars<T: ConfigMeta>(root: &mut Value) {
    for spec in T::field_specs() {
        let Some(slot) = lookup_mut(root, spec.path) else {
            continue;
        };
        let coerced = match (spec.kind, &*slot) {
            (Kind::String, Value::Number(n)) => Value::String(n.to_string()),
            (Kind::String, Value::Bool(b)) => Value::String(b.to_string()),
            (Kind::Int | Kind::Float | Kind::Bool, Value::String(raw)) => {
                match parse_literal(raw.trim(), spec.kind) {
                    Ok(value) => value,
                    Err(_) => continue,
                }
            }
            _ => continue,
        };
        trace!(path = spec.path, "coerced configuration value");
        *slot = coerced;
    }
}

fn parse_literal(raw: &str, kind: Kind) -> Result<Value, String> {
    match kind {
        Kind::Bool => match raw {
            "1" | "true" | "TRUE" | "True" => Ok(Value::Bool(true)),
            "0" | "false" | "FALSE" | "False" => Ok(Value::Bool(false)),
            _ => Err("expected a boolean".into()),
        },
        Kind::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .map_err(|_| "expected an integer".into()),
        Kind::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| "expected a float".into()),
        Kind::String => Ok(Value::String(raw.to_string())),
        Kind::Object => Err("cannot assign composite value from string".into()),
    }
}

fn check_required<T: ConfigMeta>(value: &Value, errs: &mut ValidationErrors) {
    for path in T::required_fields() {
        if !value_has_path(value, path) {
            errs.push(Issue {
                field: (*path).to_string(),
                kind: IssueKind::Missing,
                message: "required field missing".into(),
            });
        }
    }
}

fn value_has_path(value: &Value, path: &str) -> bool {
    !matches!(lookup(value, path), None | Some(Value::Null))
}
