use appconfigr::resolver::from_environment;
use appconfigr::{AppConfig, AppConfigr, ConfigError, Properties, VariableResolver};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Deserialize, AppConfig)]
struct Database {
    /// host with a default
    #[appconfig(default = "localhost", env = "DB_HOST")]
    host: String,

    /// port with validation (must be in range)
    #[appconfig(default = 5432, validate(range(min = "1024", max = "65535")))]
    port: u16,

    #[appconfig(required, validate(url))]
    url: String,
}

/// Application configuration for the loader demo, read from `demo-config.conf`.
#[derive(Debug, Deserialize, AppConfig)]
struct DemoConfig {
    /// application name with a sensible default
    #[appconfig(default = "demo-app", validate(non_empty))]
    name: String,

    /// debug flag, substituted from `${DEMO_DEBUG}`
    #[appconfig(default = false)]
    debug: bool,

    /// nested struct also derives AppConfig
    #[serde(default)]
    #[appconfig(nested)]
    database: Database,
}

fn run() -> Result<DemoConfig, ConfigError> {
    let builder = match std::env::args().nth(1) {
        Some(dir) => AppConfigr::from_directory(dir),
        None => AppConfigr::from_default_directory()?,
    };
    // environment first, built-in fallback second
    let fallback: Properties = [("DEMO_DEBUG", "false")].into_iter().collect();
    let configs = builder
        .resolver(from_environment().with_fallback(fallback))
        .build()?;
    DemoConfig::load_from(&configs)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(cfg) => {
            println!("Loaded config: {:#?}", cfg);
        }
        Err(err) => {
            eprintln!("Config error: {}", err);
            std::process::exit(1);
        }
    }
}
