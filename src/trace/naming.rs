//! Segment name resolution.
//!
//! The default name is trusted configuration; the Host header is
//! caller-supplied and only honored when the deployment explicitly opts in
//! with `dynamic_naming`. Fails closed to the default otherwise.

use crate::config::ConfigError;

/// Chooses the name for each request's segment.
#[derive(Debug, Clone)]
pub struct NameResolver {
    default_name: String,
    dynamic_naming: bool,
}

impl NameResolver {
    /// Build a resolver. An empty default name is the one fatal configuration
    /// error, rejected here so it can never surface per-request.
    pub fn new(default_name: &str, dynamic_naming: bool) -> Result<Self, ConfigError> {
        let default_name = default_name.trim();
        if default_name.is_empty() {
            return Err(ConfigError::MissingSegmentName);
        }
        Ok(Self {
            default_name: default_name.to_string(),
            dynamic_naming,
        })
    }

    /// Resolve the segment name for a request, given its Host header.
    pub fn resolve(&self, host: Option<&str>) -> String {
        if self.dynamic_naming {
            if let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) {
                return host.to_string();
            }
        }
        self.default_name.clone()
    }
}
