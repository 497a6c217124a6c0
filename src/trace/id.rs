//! Trace and segment identifier generation.
//!
//! # Responsibilities
//! - Generate trace IDs: `1-{epoch seconds as 8 hex chars}-{24 random hex chars}`
//! - Generate segment IDs: 16 random hex chars
//! - Accept inbound IDs as opaque strings (upstream services own their format)
//!
//! # Design Decisions
//! - IDs are plain strings, not parsed integers; they are only ever compared
//!   and forwarded, never computed on
//! - Random bytes come from the thread-local RNG; no counter state to share

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Globally unique identifier for one end-to-end trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh trace ID in the `1-xxxxxxxx-x{24}` format.
    pub fn generate() -> Self {
        let epoch = unix_seconds() as u64;
        Self(format!("1-{:08x}-{}", epoch, random_hex(12)))
    }

    /// Accept an inbound trace ID verbatim. Empty or whitespace-only values
    /// are rejected so a blank `Root=` entry falls back to generation.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single segment within a trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    /// Generate a fresh 16-hex-char segment ID.
    pub fn generate() -> Self {
        Self(random_hex(8))
    }

    /// Accept an inbound parent segment ID verbatim; blank values are absent.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current time as fractional seconds since the Unix epoch, the unit segment
/// timestamps are recorded in.
pub(crate) fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn random_hex(n_bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n_bytes)
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_format() {
        let id = TraceId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "1");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 24);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_segment_id_format() {
        let id = SegmentId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_from_raw_rejects_blank() {
        assert!(TraceId::from_raw("  ").is_none());
        assert!(SegmentId::from_raw("").is_none());
        assert_eq!(
            TraceId::from_raw(" abc ").unwrap().as_str(),
            "abc" // Trimmed
        );
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TraceId::generate(), TraceId::generate());
        assert_ne!(SegmentId::generate(), SegmentId::generate());
    }
}
