//! Sources for the values of `${NAME}` references in configuration files.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Outcome of a single lookup. `Missing` carries a message describing where
/// the resolver looked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    Missing(String),
}

/// Returns a value for a variable name.
///
/// Implementors only provide [`resolve`](VariableResolver::resolve), which must
/// not fail; a miss is reported as [`Resolution::Missing`] with a message.
pub trait VariableResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Resolution;

    /// Resolve `name`, turning a miss into [`ConfigError::Unresolved`].
    fn get(&self, name: &str) -> Result<String, ConfigError> {
        match self.resolve(name) {
            Resolution::Found(value) => Ok(value),
            Resolution::Missing(msg) => Err(ConfigError::Unresolved(msg)),
        }
    }

    /// Consult `self` first, then `fallback`.
    fn with_fallback<R>(self, fallback: R) -> Fallback<Self, R>
    where
        Self: Sized,
        R: VariableResolver,
    {
        Fallback {
            primary: self,
            fallback,
        }
    }
}

/// Resolver backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvResolver;

/// Shorthand for [`EnvResolver`].
pub fn from_environment() -> EnvResolver {
    EnvResolver
}

impl VariableResolver for EnvResolver {
    fn resolve(&self, name: &str) -> Resolution {
        match env::var(name) {
            Ok(value) => Resolution::Found(value),
            Err(_) => Resolution::Missing(format!(
                "[{name}] can not be resolved from the environment variables."
            )),
        }
    }
}

/// In-process, case-sensitive key/value store.
///
/// Consulted ahead of the environment by default, so a program can pin a value
/// regardless of what the surrounding shell exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `KEY=value` pairs from a `.env` file without touching the
    /// process environment.
    pub fn from_dotenv(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut props = Self::new();
        for item in dotenvy::from_path_iter(path.as_ref())? {
            let (key, value) = item?;
            props.values.insert(key, value);
        }
        Ok(props)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every entry of `other` into `self`; `other` wins on conflicts.
    pub fn extend(&mut self, other: Properties) {
        self.values.extend(other.values);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl VariableResolver for Properties {
    fn resolve(&self, name: &str) -> Resolution {
        match self.values.get(name) {
            Some(value) => Resolution::Found(value.clone()),
            None => Resolution::Missing(format!(
                "[{name}] can not be resolved from the properties."
            )),
        }
    }
}

/// Two resolvers chained with [`VariableResolver::with_fallback`].
#[derive(Debug, Clone)]
pub struct Fallback<A, B> {
    primary: A,
    fallback: B,
}

impl<A: VariableResolver, B: VariableResolver> VariableResolver for Fallback<A, B> {
    fn resolve(&self, name: &str) -> Resolution {
        let primary_msg = match self.primary.resolve(name) {
            found @ Resolution::Found(_) => return found,
            Resolution::Missing(msg) => msg,
        };
        match self.fallback.resolve(name) {
            found @ Resolution::Found(_) => found,
            Resolution::Missing(msg) => Resolution::Missing(format!("{primary_msg} {msg}")),
        }
    }
}

impl VariableResolver for Box<dyn VariableResolver> {
    fn resolve(&self, name: &str) -> Resolution {
        (**self).resolve(name)
    }
}

impl VariableResolver for Arc<dyn VariableResolver> {
    fn resolve(&self, name: &str) -> Resolution {
        (**self).resolve(name)
    }
}
