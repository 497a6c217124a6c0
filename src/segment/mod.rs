//! Segment records: one per traced request, plus nested subsegments.

pub mod cause;
pub mod http;
pub mod segment;

pub use cause::{Cause, ExceptionRecord};
pub use http::{HttpData, HttpRequestData, HttpResponseData};
pub use segment::{Segment, Subsegment};
