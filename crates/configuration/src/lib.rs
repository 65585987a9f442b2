use crate::error::ConfigError;

// Declare the modules that make up this crate.
#[cfg(feature = "clap")]
pub mod cli;
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AccountConfig, BotConfig, EventStreamConfig, ExchangeConfig, LoggingConfig, PriceBackend,
    PriceFeedConfig, ScenarioConfig, Settings,
};

/// Name of the optional settings file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides, e.g. `HARNESS__EXCHANGE__BASE_URL`.
pub const ENV_PREFIX: &str = "HARNESS";

/// Loads the application configuration.
///
/// Sources, lowest priority first: built-in defaults, the TOML file at `path`
/// (optional, `config.toml` when `None`), then `HARNESS__*` environment variables.
/// The result is validated before it is returned.
pub fn load_config(path: Option<&str>) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Missing sections fall back to `Default` through `#[serde(default)]`.
    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
