//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Read a TOML file, falling back to defaults when it does not exist.
///
/// The boolean is `false` when defaults were used.
pub fn read_config_or_default(path: &Path) -> Result<(ProxyConfig, bool), ConfigError> {
    match read_config(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            Ok((ProxyConfig::default(), false))
        }
        Err(e) => Err(e),
    }
}
