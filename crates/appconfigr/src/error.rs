use crate::format::Format;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A structured validation error for a config field.
#[derive(Debug, Clone)]
pub struct Issue {
    pub field: String,
    pub kind: IssueKind,
    pub message: String,
}

/// The type of validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    Range,
    Regex,
    Url,
    NonEmpty,
}

/// Aggregated validation errors across multiple fields.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    issues: Vec<Issue>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.issues.extend(other.issues);
    }

    /// Re-root every issue under `prefix`, used when a nested struct reports.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        for issue in &mut self.issues {
            issue.field = format!("{prefix}.{}", issue.field);
        }
        self
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "no validation errors");
        }
        writeln!(f, "validation failed:")?;
        for issue in &self.issues {
            writeln!(f, "  - {}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// The top-level error type for building an [`AppConfigr`](crate::AppConfigr)
/// and loading configurations through it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "the given path is not a valid directory [{}]; this check can be suppressed by calling no_check() on the builder",
        .0.display()
    )]
    NotADirectory(PathBuf),

    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("configuration [{name}] not found in any of {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{format} parse error in {}: {source}", .path.display())]
    Parse {
        format: Format,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{} support is disabled; enable the `{}` feature", .0, .0.feature())]
    FormatDisabled(Format),

    #[error("{0}")]
    Unresolved(String),

    #[error("environment override {var}: {message}")]
    Env { var: String, message: String },

    #[error("cannot bind configuration [{name}]: {source}")]
    Bind {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("dotenv error: {0}")]
    Dotenv(#[from] dotenvy::Error),
}
