//! Inbound trace header parsing and re-emission.
//!
//! # Responsibilities
//! - Parse `X-Amzn-Trace-Id` into trace ID, parent segment ID, sampling decision
//! - Tolerate absent or malformed headers (fall back to a fresh root context)
//! - Re-emit the context as a header value for downstream calls
//!
//! # Design Decisions
//! - Parsing is total: it never fails, it degrades to a fresh root context
//! - Keys are matched case-insensitively (`Root=` and `root=` both work)
//! - Unknown entries are ignored so future header extensions pass through

use axum::http::{HeaderMap, HeaderValue};

use crate::trace::id::{SegmentId, TraceId};

/// Header carrying the trace context between services.
pub const TRACE_HEADER: &str = "x-amzn-trace-id";

/// Upstream sampling decision carried in the `Sampled=` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleDecision {
    /// `Sampled=1`: upstream asked for this trace to be recorded.
    Requested,
    /// `Sampled=0`: upstream declined recording.
    NotRequested,
    /// No entry, or `Sampled=?`: decision deferred to this service.
    #[default]
    Unknown,
}

impl SampleDecision {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "1" => SampleDecision::Requested,
            "0" => SampleDecision::NotRequested,
            _ => SampleDecision::Unknown,
        }
    }

    fn as_header_str(&self) -> &'static str {
        match self {
            SampleDecision::Requested => "1",
            SampleDecision::NotRequested => "0",
            SampleDecision::Unknown => "?",
        }
    }
}

/// Immutable parse result of the inbound trace header.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceContext {
    pub trace_id: TraceId,
    pub parent_id: Option<SegmentId>,
    pub sampled: SampleDecision,
}

impl TraceContext {
    /// Fresh root context: generated trace ID, no parent, decision open.
    pub fn new_root() -> Self {
        Self {
            trace_id: TraceId::generate(),
            parent_id: None,
            sampled: SampleDecision::Unknown,
        }
    }

    /// Parse a raw header value. `None` or an unrecognizable value yields a
    /// fresh root context; individual missing entries get defaults.
    pub fn parse(header: Option<&str>) -> Self {
        let Some(raw) = header else {
            return Self::new_root();
        };

        let mut trace_id = None;
        let mut parent_id = None;
        let mut sampled = SampleDecision::Unknown;

        for entry in raw.split(';') {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "root" => trace_id = TraceId::from_raw(value),
                "parent" => parent_id = SegmentId::from_raw(value),
                "self" => {} // Emitted by some load balancers; not a parent
                "sampled" => sampled = SampleDecision::parse(value),
                _ => {}
            }
        }

        match trace_id {
            Some(trace_id) => Self {
                trace_id,
                parent_id,
                sampled,
            },
            // No usable Root entry: the whole header is treated as absent,
            // including any Parent entry (a parent without its trace is
            // meaningless).
            None => Self::new_root(),
        }
    }

    /// Render the context back into the delimited header encoding.
    pub fn to_header_value(&self) -> String {
        let mut value = format!("Root={}", self.trace_id);
        if let Some(parent) = &self.parent_id {
            value.push_str(&format!(";Parent={}", parent));
        }
        value.push_str(&format!(";Sampled={}", self.sampled.as_header_str()));
        value
    }

    /// Write the context into an outbound header map for downstream calls.
    pub fn inject(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.to_header_value()) {
            headers.insert(TRACE_HEADER, value);
        }
    }
}
