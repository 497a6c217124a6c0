//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the required segment name is present
//! - Validate addresses parse before any socket is opened
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TracingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{EmitterKind, TracingConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("segment_name must be a non-empty string")]
    MissingSegmentName,

    #[error("daemon_address '{0}' is not a valid socket address")]
    InvalidDaemonAddress(String),

    #[error("metrics_address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, accumulating every problem found.
pub fn validate_config(config: &TracingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.segment_name.trim().is_empty() {
        errors.push(ValidationError::MissingSegmentName);
    }

    if config.emitter == EmitterKind::Udp
        && config.daemon_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidDaemonAddress(
            config.daemon_address.clone(),
        ));
    }

    if config.metrics_enabled && config.metrics_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
