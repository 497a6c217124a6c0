//! Request tracing middleware.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → parse X-Amzn-Trace-Id → TraceContext
//!     → resolve segment name (configured default vs Host header)
//!     → open Segment, attach request data
//!     → bind into store (task-local or request extensions)
//!     → run inner service
//!     → completion (response / error / client abort)
//!     → apply status flags, close once, hand to Emitter
//! ```

pub mod layer;

pub use layer::{TracingLayer, TracingService};

use axum::http::Request;

use crate::segment::Segment;

/// Extension trait for reading the segment off a request in manual mode.
pub trait SegmentExt {
    /// The segment the middleware attached to this request, if any.
    fn segment(&self) -> Option<Segment>;
}

impl<B> SegmentExt for Request<B> {
    fn segment(&self) -> Option<Segment> {
        self.extensions().get::<Segment>().cloned()
    }
}
