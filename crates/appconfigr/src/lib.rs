//! appconfigr – typed configuration files from a directory.
//!
//! ```no_run
//! use appconfigr::{AppConfig, AppConfigr};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, AppConfig)]
//! #[serde(rename_all = "camelCase")]
//! struct SampleConfig {
//!     #[appconfig(default = 8080, validate(range(min = "1", max = "65535")))]
//!     port: u16,
//!     #[appconfig(required)]
//!     sample_string: String,
//! }
//!
//! let configs = AppConfigr::from_directory("config").build()?;
//! // reads config/sample-config.conf (YAML unless told otherwise)
//! let sample: SampleConfig = configs.config()?;
//! # Ok::<(), appconfigr::ConfigError>(())
//! ```
//!
//! Files may reference `${NAME}` variables; they resolve against builder
//! properties first and the process environment second.

pub mod error;
pub mod format;
pub mod loader;
pub mod merge;
pub mod resolver;
pub mod types;
pub mod util;
pub mod variables;

pub use appconfigr_derive::AppConfig;
pub use error::{ConfigError, ValidationErrors};
pub use format::Format;
pub use loader::{AppConfigr, Builder};
pub use resolver::{Properties, Resolution, VariableResolver};
pub use types::{ConfigMeta, FieldSpec, Kind, Validate};

/// The parsed configuration tree shared by every format.
pub use serde_json::Value as ConfigNode;

// Paths the derive macro expands to, so user crates need no direct
// dependency on these.
#[doc(hidden)]
pub mod __private {
    pub use regex;
    pub use serde_json;
    pub use url;
}
