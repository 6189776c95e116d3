// In crates/app-config/src/lib.rs

use config::{Config, Environment, File, FileFormat};
use std::path::Path;

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{AppSettings, Settings, TradingConfig};

/// Loads and validates the application settings.
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. `config/base.toml`
/// 2. `config/{APP_ENVIRONMENT}.toml`, if present
/// 3. environment variables such as `APP__TRADING__RISK__LEVERAGE=3`
pub fn load_settings() -> Result<Settings> {
    load_settings_from(Path::new("config"))
}

/// Same as [`load_settings`] with the config directory supplied by the caller.
pub fn load_settings_from(dir: &Path) -> Result<Settings> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        .add_source(File::from(dir.join("base")))
        .add_source(File::from(dir.join(&environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;
    tracing::debug!(environment = %settings.app.environment, "Configuration loaded.");
    Ok(settings)
}

/// Parses and validates settings from a TOML document.
pub fn settings_from_toml(content: &str) -> Result<Settings> {
    let settings: Settings = Config::builder()
        .add_source(File::from_str(content, FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

/// Renders the effective configuration.
pub fn to_toml_string(settings: &Settings) -> Result<String> {
    Ok(toml::to_string_pretty(settings)?)
}
