//! Configuration schema definitions.
//!
//! This module defines the tracing configuration structure. All types derive
//! Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::store::PropagationMode;

/// Root configuration for request tracing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Default segment name. Required: an empty value fails middleware
    /// construction, never an individual request.
    pub segment_name: String,

    /// Allow the Host header to name segments. Off by default: request
    /// headers are caller-supplied and untrusted.
    pub dynamic_naming: bool,

    /// How the current segment reaches downstream code.
    pub mode: PropagationMode,

    /// Where finished segments go.
    pub emitter: EmitterKind,

    /// Trace daemon address for the UDP emitter.
    pub daemon_address: String,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics exposition address.
    pub metrics_address: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            segment_name: String::new(),
            dynamic_naming: false,
            mode: PropagationMode::Automatic,
            emitter: EmitterKind::Udp,
            daemon_address: "127.0.0.1:2000".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}

/// Segment transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitterKind {
    /// Datagrams to the local trace daemon.
    #[default]
    Udp,
    /// Structured log lines (development, daemon-less environments).
    Log,
}
