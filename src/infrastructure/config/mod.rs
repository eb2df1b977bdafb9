//! Layered configuration for both tools.
//!
//! Priority (highest to lowest):
//! 1. Command line flags (applied by the caller after loading)
//! 2. Environment variables (`SCRUBDUMP_EXPORTER__HOST`, `SCRUBDUMP_SANITIZER__MARKER`, ...)
//! 3. The TOML file given with `--config`
//! 4. Built-in defaults

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::export::ExporterConfig;
use crate::domain::sanitizer::SanitizerConfig;

pub const ENV_PREFIX: &str = "SCRUBDUMP_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sanitizer: SanitizerConfig,
    pub exporter: ExporterConfig,
}

pub fn load_config(config_file: Option<&Path>) -> Result<AppConfig> {
    load_config_with_prefix(config_file, ENV_PREFIX)
}

fn load_config_with_prefix(config_file: Option<&Path>, env_prefix: &str) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(env_prefix).split("__"));

    let config: AppConfig = figment.extract()?;
    Ok(config)
}
