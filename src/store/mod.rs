//! Current-segment binding and propagation.
//!
//! # Responsibilities
//! - Bind the request's segment to its logical execution context
//! - Serve `current_segment()` lookups from arbitrary downstream code
//! - Keep bindings isolated between concurrently-handled requests
//!
//! # Design Decisions
//! - Automatic mode uses `tokio::task_local!`: the binding flows into every
//!   await point of the request's task and is invisible to other tasks,
//!   giving thread-local-equivalent isolation for async execution
//! - Manual mode skips the task-local entirely; the segment rides on the
//!   request's extensions and handlers read it explicitly
//! - The mode is process-wide and fixed by the first middleware constructed;
//!   later mismatches are logged and ignored rather than honored

use std::future::Future;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

tokio::task_local! {
    static CURRENT_SEGMENT: Segment;
}

/// How the current segment reaches downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationMode {
    /// Task-local binding; `current_segment()` works anywhere in the request.
    #[default]
    Automatic,
    /// Segment attached to the request's extensions; no implicit lookup.
    Manual,
}

static ACTIVE_MODE: OnceLock<PropagationMode> = OnceLock::new();

/// Fix the process-wide propagation mode. The first caller wins; a later
/// conflicting request keeps the established mode and logs the mismatch.
pub fn init_mode(requested: PropagationMode) -> PropagationMode {
    let active = *ACTIVE_MODE.get_or_init(|| requested);
    if active != requested {
        tracing::warn!(
            ?active,
            ?requested,
            "Propagation mode already fixed for this process; keeping the established mode"
        );
    }
    active
}

/// Run a future with `segment` bound as the current segment for everything
/// the future awaits.
pub async fn scope<F>(segment: Segment, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_SEGMENT.scope(segment, future).await
}

/// The segment bound to the current logical execution context, if any.
/// Returns `None` outside a traced request or in manual mode.
pub fn current_segment() -> Option<Segment> {
    CURRENT_SEGMENT.try_with(|segment| segment.clone()).ok()
}
