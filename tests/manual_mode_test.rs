//! Manual propagation mode: the segment rides on the request's extensions
//! and the task-local lookup stays empty.
//!
//! Lives in its own test binary because the propagation mode is fixed
//! process-wide by the first middleware constructed.

use axum::body::Body;
use axum::extract::Request;
use axum::http::Request as HttpRequest;
use axum::{routing::get, Router};
use request_tracing::emitter::BufferEmitter;
use request_tracing::store::PropagationMode;
use request_tracing::{current_segment, SegmentExt, TracingLayer};
use tower::ServiceExt;

mod common;

async fn handler(req: Request) -> &'static str {
    let segment = req.segment().expect("segment attached to request");
    segment.add_annotation("manual", true);
    assert!(current_segment().is_none());
    "ok"
}

#[tokio::test]
async fn test_manual_mode_uses_request_extensions() {
    let mut config = common::test_config();
    config.mode = PropagationMode::Manual;

    let emitter = BufferEmitter::new();
    let layer = TracingLayer::with_emitter(&config, emitter.clone()).unwrap();
    let app = Router::new().route("/", get(handler)).layer(layer);

    let req = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert!(response.status().is_success());

    let wire = emitter.last().unwrap();
    assert_eq!(wire["annotations"]["manual"], true);
    assert_eq!(wire["name"], "test-service");
}
