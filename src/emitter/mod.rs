//! Finalized-segment emission.
//!
//! # Responsibilities
//! - Define the seam between the request lifecycle and segment transport
//! - Provide the default transports: UDP trace daemon and structured logs
//! - Provide an in-memory emitter for assertions in tests
//!
//! # Design Decisions
//! - Emission is best-effort and synchronous; a lost segment is logged, never
//!   surfaced to the request path
//! - Serialization failures count as emit failures, not panics

use std::sync::{Arc, Mutex};

use crate::config::{ConfigError, EmitterKind, TracingConfig};
use crate::metrics;
use crate::segment::Segment;

pub mod udp;

pub use udp::UdpEmitter;

/// Transport for finalized segments.
pub trait Emitter: Send + Sync {
    fn emit(&self, segment: &Segment);
}

/// Build the configured emitter.
pub fn from_config(config: &TracingConfig) -> Result<Arc<dyn Emitter>, ConfigError> {
    match config.emitter {
        EmitterKind::Udp => Ok(Arc::new(UdpEmitter::new(&config.daemon_address)?)),
        EmitterKind::Log => Ok(Arc::new(LogEmitter)),
    }
}

/// Writes finished segments to the log stream. Useful in development and in
/// environments without a trace daemon.
pub struct LogEmitter;

impl Emitter for LogEmitter {
    fn emit(&self, segment: &Segment) {
        match segment.to_wire() {
            Ok(wire) => {
                tracing::info!(segment = %wire, "Segment completed");
                metrics::record_segment_emitted("log");
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize segment");
                metrics::record_emit_failure("log");
            }
        }
    }
}

/// Retains emitted segments in memory so tests can assert on them.
#[derive(Default)]
pub struct BufferEmitter {
    segments: Mutex<Vec<String>>,
}

impl BufferEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of segments emitted so far.
    pub fn count(&self) -> usize {
        self.segments.lock().unwrap().len()
    }

    /// All emitted segments as parsed JSON, in emission order.
    pub fn emitted(&self) -> Vec<serde_json::Value> {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .filter_map(|wire| serde_json::from_str(wire).ok())
            .collect()
    }

    /// The most recently emitted segment as parsed JSON.
    pub fn last(&self) -> Option<serde_json::Value> {
        self.segments
            .lock()
            .unwrap()
            .last()
            .and_then(|wire| serde_json::from_str(wire).ok())
    }
}

impl Emitter for BufferEmitter {
    fn emit(&self, segment: &Segment) {
        if let Ok(wire) = segment.to_wire() {
            self.segments.lock().unwrap().push(wire);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceContext;

    #[test]
    fn test_buffer_emitter_captures_wire_shape() {
        let emitter = BufferEmitter::new();
        let segment = Segment::new("svc", &TraceContext::new_root());
        segment.set_response_status(200);
        segment.close();

        emitter.emit(&segment);
        assert_eq!(emitter.count(), 1);

        let wire = emitter.last().unwrap();
        assert_eq!(wire["name"], "svc");
        assert_eq!(wire["http"]["response"]["status"], 200);
    }

    #[test]
    fn test_from_config_selects_kind() {
        let config = TracingConfig {
            segment_name: "svc".into(),
            emitter: EmitterKind::Log,
            ..Default::default()
        };
        assert!(from_config(&config).is_ok());

        let config = TracingConfig {
            segment_name: "svc".into(),
            emitter: EmitterKind::Udp,
            daemon_address: "127.0.0.1:2000".into(),
            ..Default::default()
        };
        assert!(from_config(&config).is_ok());
    }
}
