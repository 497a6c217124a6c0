//! Tower layer implementing the request tracing lifecycle.
//!
//! # Responsibilities
//! - Open a segment per request from the parsed trace header
//! - Bind it into the store for the downstream call
//! - Finalize exactly once across every completion path
//!
//! # Design Decisions
//! - Completion paths (normal response, inner-service error, future dropped
//!   on client abort) all funnel into one finalize guard; the segment's own
//!   atomic closed flag makes the race between them safe
//! - Tracing failures degrade to log lines; the inner service always runs.
//!   The empty default name is the one fatal error, rejected at construction
//! - Inner-service errors are recorded on the segment and re-propagated
//!   unchanged; the segment never swallows application errors

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{header, Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::config::{ConfigError, TracingConfig};
use crate::emitter::{self, Emitter};
use crate::metrics;
use crate::segment::{HttpRequestData, Segment};
use crate::store::{self, PropagationMode};
use crate::trace::{NameResolver, SampleDecision, TraceContext, TRACE_HEADER};

pub(crate) struct Shared {
    pub(crate) resolver: NameResolver,
    pub(crate) emitter: Arc<dyn Emitter>,
    pub(crate) mode: PropagationMode,
}

/// Layer that wraps a service with request tracing.
#[derive(Clone)]
pub struct TracingLayer {
    shared: Arc<Shared>,
}

impl TracingLayer {
    /// Build the layer with the emitter selected by the configuration.
    pub fn new(config: &TracingConfig) -> Result<Self, ConfigError> {
        // Name check comes first so a broken config fails before any socket
        // is opened.
        let resolver = NameResolver::new(&config.segment_name, config.dynamic_naming)?;
        let emitter = emitter::from_config(config)?;
        Ok(Self::assemble(resolver, emitter, config.mode))
    }

    /// Build the layer with a caller-supplied emitter.
    pub fn with_emitter(
        config: &TracingConfig,
        emitter: Arc<dyn Emitter>,
    ) -> Result<Self, ConfigError> {
        let resolver = NameResolver::new(&config.segment_name, config.dynamic_naming)?;
        Ok(Self::assemble(resolver, emitter, config.mode))
    }

    fn assemble(
        resolver: NameResolver,
        emitter: Arc<dyn Emitter>,
        mode: PropagationMode,
    ) -> Self {
        let mode = store::init_mode(mode);
        Self {
            shared: Arc::new(Shared {
                resolver,
                emitter,
                mode,
            }),
        }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            shared: self.shared.clone(),
        }
    }
}

/// Service produced by [`TracingLayer`].
#[derive(Clone)]
pub struct TracingService<S> {
    pub(crate) inner: S,
    pub(crate) shared: Arc<Shared>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TracingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let shared = self.shared.clone();
        // Use the service that was polled ready; keep the clone for later calls.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let trace_header = req
                .headers()
                .get(TRACE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let context = TraceContext::parse(trace_header.as_deref());

            let host = req
                .headers()
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let name = shared.resolver.resolve(host.as_deref());

            let segment = Segment::new(&name, &context);
            segment.add_incoming_request_data(HttpRequestData::from_request(&req));
            metrics::record_segment_opened(&name);
            tracing::debug!(
                segment_id = %segment.id(),
                trace_id = %segment.trace_id(),
                name = %name,
                "Segment opened"
            );

            let mut guard = FinalizeGuard::new(segment.clone(), shared.emitter.clone());

            let result = match shared.mode {
                PropagationMode::Automatic => {
                    store::scope(segment.clone(), async move { inner.call(req).await }).await
                }
                PropagationMode::Manual => {
                    req.extensions_mut().insert(segment.clone());
                    inner.call(req).await
                }
            };

            match result {
                Ok(response) => {
                    segment.set_response_status(response.status().as_u16());
                    guard.finalize();
                    Ok(response)
                }
                Err(err) => {
                    segment.add_error_message(err.to_string());
                    guard.finalize();
                    Err(err)
                }
            }
        })
    }
}

/// Closes and emits the segment exactly once. The explicit completion paths
/// call `finalize`; dropping the guard un-finalized (client abort, panic
/// unwinding through the future) covers the rest.
struct FinalizeGuard {
    segment: Segment,
    emitter: Arc<dyn Emitter>,
    armed: bool,
}

impl FinalizeGuard {
    fn new(segment: Segment, emitter: Arc<dyn Emitter>) -> Self {
        Self {
            segment,
            emitter,
            armed: true,
        }
    }

    fn finalize(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        // close() arbitrates between completion paths: only the first caller
        // observes true and performs the hand-off.
        if !self.segment.close() {
            return;
        }
        if self.segment.sample_decision() == SampleDecision::NotRequested {
            tracing::debug!(
                segment_id = %self.segment.id(),
                "Segment not sampled; skipping emission"
            );
            return;
        }
        self.emitter.emit(&self.segment);
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(
                segment_id = %self.segment.id(),
                "Request ended before a completion event; finalizing segment"
            );
            self.finalize();
        }
    }
}
