use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{AppConfig, ConfigError};

/// Environment prefix of every setting.
pub const ENV_PREFIX: &str = "TICKETFLOW_";

/// Builds the provider chain: defaults, then `path` if given, then the environment.
pub fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load configuration from an optional file with environment variable overrides.
///
/// The result is not validated; commands that talk to the service call
/// [`AppConfig::validate`].
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
    }

    Ok(figment(path).extract()?)
}

/// Load configuration from a TOML string over the defaults (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    Ok(Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::string(toml_str))
        .extract()?)
}
