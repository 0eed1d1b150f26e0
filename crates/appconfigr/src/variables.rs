//! `${NAME}` references inside configuration values.

use crate::error::ConfigError;
use crate::resolver::VariableResolver;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{(?P<var>[\w.]+)\}").expect("static pattern compiles"))
}

/// A single `${NAME}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    name: String,
}

impl Expression {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The variable name between the braces.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.name)
    }
}

/// All references in `content`, in order of appearance.
pub fn find(content: &str) -> Vec<Expression> {
    pattern()
        .captures_iter(content)
        .map(|caps| Expression::new(&caps["var"]))
        .collect()
}

/// Replace every reference in `content` with the value `resolver` returns.
///
/// Values are inserted verbatim and not scanned again. The first reference the
/// resolver cannot satisfy aborts the substitution.
pub fn substitute<R>(content: &str, resolver: &R) -> Result<String, ConfigError>
where
    R: VariableResolver + ?Sized,
{
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in pattern().captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps["var"];
        tracing::trace!(variable = name, "resolving configuration variable");
        out.push_str(&content[last..whole.start()]);
        out.push_str(&resolver.get(name)?);
        last = whole.end();
    }
    out.push_str(&content[last..]);
    Ok(out)
}

/// Substitute references inside every string scalar of a parsed tree.
///
/// Mapping keys and comments are never touched, and a resolved value always
/// stays a single string scalar whatever characters it contains.
pub fn substitute_node<R>(node: &mut Value, resolver: &R) -> Result<(), ConfigError>
where
    R: VariableResolver + ?Sized,
{
    match node {
        Value::String(text) => {
            if pattern().is_match(text) {
                *text = substitute(text, resolver)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_node(item, resolver)?;
            }
        }
        Value::Object(map) => {
            for (_, value) in map.iter_mut() {
                substitute_node(value, resolver)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}
