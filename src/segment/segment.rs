//! Segment record and lifecycle.
//!
//! # Responsibilities
//! - Record one request's identity, timing, status flags, and error detail
//! - Close exactly once, regardless of which completion path fires first
//! - Stay safely mutable from handler code and completion observers at once
//!
//! # Design Decisions
//! - `Segment` is a cheap clone-able handle (`Arc` inside) so the middleware,
//!   the store binding, and downstream code all mutate the same record
//! - The closed flag is an `AtomicBool` flipped with `swap`; the first caller
//!   to close wins and later completion paths are inert
//! - `add_error` is accepted even after close: error delivery can race or
//!   follow the completion event and must not drop data

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

use crate::segment::cause::{Cause, ExceptionRecord};
use crate::segment::http::{HttpData, HttpRequestData, HttpResponseData};
use crate::trace::context::{SampleDecision, TraceContext};
use crate::trace::id::{unix_seconds, SegmentId, TraceId};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serialized shape of a segment, matching the trace daemon wire format.
#[derive(Debug, Clone, Serialize)]
struct SegmentState {
    name: String,
    id: SegmentId,
    trace_id: TraceId,
    start_time: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<f64>,

    #[serde(skip_serializing_if = "is_false")]
    in_progress: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<SegmentId>,

    #[serde(skip_serializing_if = "is_false")]
    error: bool,

    #[serde(skip_serializing_if = "is_false")]
    fault: bool,

    #[serde(skip_serializing_if = "is_false")]
    throttle: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<Cause>,

    #[serde(skip_serializing_if = "Option::is_none")]
    http: Option<HttpData>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    annotations: HashMap<String, Value>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    subsegments: Vec<SubsegmentState>,
}

/// A nested unit of work owned exclusively by its parent segment.
#[derive(Debug, Clone, Serialize)]
struct SubsegmentState {
    name: String,
    id: SegmentId,
    start_time: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<f64>,

    #[serde(skip_serializing_if = "is_false")]
    in_progress: bool,
}

struct SegmentInner {
    closed: AtomicBool,
    sampled: SampleDecision,
    state: Mutex<SegmentState>,
}

/// Record of one traced request. Clones share the same underlying record.
#[derive(Clone)]
pub struct Segment {
    inner: Arc<SegmentInner>,
}

impl Segment {
    /// Create an open segment from the parsed trace context.
    pub fn new(name: &str, context: &TraceContext) -> Self {
        let state = SegmentState {
            name: name.to_string(),
            id: SegmentId::generate(),
            trace_id: context.trace_id.clone(),
            start_time: unix_seconds(),
            end_time: None,
            in_progress: true,
            parent_id: context.parent_id.clone(),
            error: false,
            fault: false,
            throttle: false,
            cause: None,
            http: None,
            annotations: HashMap::new(),
            metadata: HashMap::new(),
            subsegments: Vec::new(),
        };
        Self {
            inner: Arc::new(SegmentInner {
                closed: AtomicBool::new(false),
                sampled: context.sampled,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn id(&self) -> SegmentId {
        self.lock().id.clone()
    }

    pub fn trace_id(&self) -> TraceId {
        self.lock().trace_id.clone()
    }

    pub fn parent_id(&self) -> Option<SegmentId> {
        self.lock().parent_id.clone()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.lock().end_time
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn sample_decision(&self) -> SampleDecision {
        self.inner.sampled
    }

    /// Attach the inbound request data. Ignored once the segment is closed.
    pub fn add_incoming_request_data(&self, data: HttpRequestData) {
        if self.is_closed() {
            tracing::debug!(segment_id = %self.id(), "Request data dropped: segment already closed");
            return;
        }
        let mut state = self.lock();
        state.http.get_or_insert_with(HttpData::default).request = Some(data);
    }

    /// Record the response status and derive status flags from it:
    /// 4xx sets `error`, 429 additionally sets `throttle`, 5xx sets `fault`.
    /// Ignored once the segment is closed.
    pub fn set_response_status(&self, status: u16) {
        if self.is_closed() {
            tracing::debug!(segment_id = %self.id(), status, "Response status dropped: segment already closed");
            return;
        }
        let mut state = self.lock();
        state.http.get_or_insert_with(HttpData::default).response =
            Some(HttpResponseData { status });
        match status {
            429 => {
                state.error = true;
                state.throttle = true;
            }
            400..=499 => state.error = true,
            500..=599 => state.fault = true,
            _ => {}
        }
    }

    /// Record an error with its source chain. Accumulates across calls and is
    /// accepted even after the segment is closed.
    pub fn add_error(&self, error: &(dyn std::error::Error + 'static)) {
        self.push_exception(ExceptionRecord::from_error(error));
    }

    /// Record an error from a bare message (e.g. a service error that is
    /// `Display` but not `std::error::Error`).
    pub fn add_error_message(&self, message: impl Into<String>) {
        self.push_exception(ExceptionRecord::from_message(message));
    }

    fn push_exception(&self, record: ExceptionRecord) {
        let mut state = self.lock();
        state.error = true;
        state
            .cause
            .get_or_insert_with(Cause::default)
            .exceptions
            .push(record);
    }

    /// Attach an indexed annotation. Ignored once the segment is closed.
    pub fn add_annotation(&self, key: impl Into<String>, value: impl Into<Value>) {
        if self.is_closed() {
            return;
        }
        self.lock().annotations.insert(key.into(), value.into());
    }

    /// Attach unindexed metadata. Ignored once the segment is closed.
    pub fn add_metadata(&self, key: impl Into<String>, value: impl Into<Value>) {
        if self.is_closed() {
            return;
        }
        self.lock().metadata.insert(key.into(), value.into());
    }

    /// Open a subsegment for a narrower unit of work within this request.
    /// Returns `None` once the segment is closed.
    pub fn begin_subsegment(&self, name: &str) -> Option<Subsegment> {
        if self.is_closed() {
            return None;
        }
        let id = SegmentId::generate();
        self.lock().subsegments.push(SubsegmentState {
            name: name.to_string(),
            id: id.clone(),
            start_time: unix_seconds(),
            end_time: None,
            in_progress: true,
        });
        Some(Subsegment {
            parent: self.clone(),
            id,
        })
    }

    /// Close the segment. The first call sets `end_time` and returns true;
    /// every later call is inert and returns false.
    pub fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut state = self.lock();
        state.end_time = Some(unix_seconds());
        state.in_progress = false;
        // Open subsegments are closed with the parent; an abandoned child
        // must not keep the record in progress forever.
        let end = state.end_time;
        for sub in state.subsegments.iter_mut().filter(|s| s.in_progress) {
            sub.end_time = end;
            sub.in_progress = false;
        }
        true
    }

    /// Serialize the current record for emission.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&*self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SegmentState> {
        // A poisoned lock means a panic mid-mutation; the record is still
        // more useful emitted than dropped.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Segment")
            .field("name", &state.name)
            .field("id", &state.id)
            .field("trace_id", &state.trace_id)
            .field("in_progress", &state.in_progress)
            .finish()
    }
}

/// Handle to an open subsegment. Closing is idempotent; dropping the handle
/// without closing leaves it to be closed with the parent.
#[derive(Clone)]
pub struct Subsegment {
    parent: Segment,
    id: SegmentId,
}

impl Subsegment {
    pub fn id(&self) -> SegmentId {
        self.id.clone()
    }

    /// Close this subsegment. Inert if it (or the parent) already closed it.
    pub fn close(&self) {
        let mut state = self.parent.lock();
        if let Some(sub) = state
            .subsegments
            .iter_mut()
            .find(|s| s.id == self.id && s.in_progress)
        {
            sub.end_time = Some(unix_seconds());
            sub.in_progress = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_segment() -> Segment {
        Segment::new("test-service", &TraceContext::new_root())
    }

    #[test]
    fn test_init_sets_identity_and_timing() {
        let ctx = TraceContext::parse(Some(
            "Root=1-f9194208-2c7ad569f5d6ff149137be86;Parent=2c7ad569f5d6ff14",
        ));
        let segment = Segment::new("svc", &ctx);
        assert_eq!(segment.name(), "svc");
        assert_eq!(segment.trace_id().as_str(), "1-f9194208-2c7ad569f5d6ff149137be86");
        assert_eq!(segment.parent_id().unwrap().as_str(), "2c7ad569f5d6ff14");
        assert!(!segment.is_closed());
        assert!(segment.end_time().is_none());
    }

    #[test]
    fn test_status_flag_derivation() {
        for (status, error, fault, throttle) in [
            (200u16, false, false, false),
            (301, false, false, false),
            (400, true, false, false),
            (404, true, false, false),
            (429, true, false, true),
            (500, false, true, false),
            (503, false, true, false),
        ] {
            let segment = open_segment();
            segment.set_response_status(status);
            let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
            assert_eq!(wire.get("error").is_some(), error, "status {status}");
            assert_eq!(wire.get("fault").is_some(), fault, "status {status}");
            assert_eq!(wire.get("throttle").is_some(), throttle, "status {status}");
        }
    }

    #[test]
    fn test_errors_accumulate() {
        let segment = open_segment();
        segment.add_error_message("first");
        segment.add_error_message("second");

        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        assert_eq!(wire["error"], Value::Bool(true));
        assert_eq!(wire["cause"]["exceptions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_error_accepted_after_close() {
        let segment = open_segment();
        segment.close();
        segment.add_error_message("late delivery");

        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        assert_eq!(wire["cause"]["exceptions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let segment = open_segment();
        assert!(segment.close());
        let first_end = segment.end_time().unwrap();

        assert!(!segment.close());
        assert_eq!(segment.end_time().unwrap(), first_end);
        assert!(segment.is_closed());
    }

    #[test]
    fn test_mutations_dropped_after_close() {
        let segment = open_segment();
        segment.close();

        segment.set_response_status(500);
        segment.add_annotation("key", "value");
        assert!(segment.begin_subsegment("late").is_none());

        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        assert!(wire.get("fault").is_none());
        assert!(wire.get("annotations").is_none());
        assert!(wire.get("subsegments").is_none());
    }

    #[test]
    fn test_subsegment_lifecycle() {
        let segment = open_segment();
        let sub = segment.begin_subsegment("db-query").unwrap();
        sub.close();
        sub.close(); // Inert

        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        let subs = wire["subsegments"].as_array().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0]["name"], "db-query");
        assert!(subs[0].get("end_time").is_some());
        assert!(subs[0].get("in_progress").is_none());
    }

    #[test]
    fn test_open_subsegment_closed_with_parent() {
        let segment = open_segment();
        let _sub = segment.begin_subsegment("abandoned").unwrap();
        segment.close();

        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        assert!(wire["subsegments"][0].get("end_time").is_some());
    }

    #[test]
    fn test_wire_shape_while_open_and_closed() {
        let segment = open_segment();
        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        assert_eq!(wire["in_progress"], Value::Bool(true));
        assert!(wire.get("end_time").is_none());

        segment.close();
        let wire: Value = serde_json::from_str(&segment.to_wire().unwrap()).unwrap();
        assert!(wire.get("in_progress").is_none());
        assert!(wire.get("end_time").is_some());
    }

    #[test]
    fn test_concurrent_close_single_winner() {
        let segment = open_segment();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let seg = segment.clone();
            handles.push(std::thread::spawn(move || seg.close()));
        }
        let winners: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
