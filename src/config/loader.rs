//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TracingConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and middleware construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("default segment name was not supplied; provide a non-empty string")]
    MissingSegmentName,

    #[error("daemon_address '{0}' is not a valid socket address")]
    InvalidDaemonAddress(String),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<TracingConfig, ConfigError> {
    let config: TracingConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TracingConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
