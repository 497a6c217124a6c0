//! Trace identity subsystem.
//!
//! # Data Flow
//! ```text
//! X-Amzn-Trace-Id header
//!     → context.rs (parse Root/Parent/Sampled, or generate fresh)
//!     → naming.rs (choose segment name: configured default vs Host header)
//!     → [segment created from the parsed context]
//!     → context.rs (re-emit header for downstream calls)
//! ```

pub mod context;
pub mod id;
pub mod naming;

pub use context::{SampleDecision, TraceContext, TRACE_HEADER};
pub use id::{SegmentId, TraceId};
pub use naming::NameResolver;
