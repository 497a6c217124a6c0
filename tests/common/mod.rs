//! Shared utilities for integration testing.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{routing::get, Router};

use request_tracing::config::{EmitterKind, TracingConfig};
use request_tracing::emitter::BufferEmitter;
use request_tracing::{current_segment, TracingLayer};

/// Valid baseline configuration for tests.
pub fn test_config() -> TracingConfig {
    TracingConfig {
        segment_name: "test-service".to_string(),
        emitter: EmitterKind::Log,
        ..Default::default()
    }
}

/// A router with representative handlers behind the tracing layer, emitting
/// into the given buffer.
pub fn traced_app(emitter: Arc<BufferEmitter>) -> Router {
    let layer = TracingLayer::with_emitter(&test_config(), emitter).unwrap();
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/whoami", get(whoami))
        .route("/slow-whoami", get(slow_whoami))
        .route("/status/{code}", get(status))
        .layer(layer)
}

/// Echo the current segment's identity as `trace_id|parent_id`.
fn describe_current() -> String {
    match current_segment() {
        Some(segment) => format!(
            "{}|{}",
            segment.trace_id(),
            segment
                .parent_id()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        None => "none".to_string(),
    }
}

async fn whoami() -> String {
    describe_current()
}

async fn slow_whoami() -> String {
    // Suspend a few times so concurrently-handled requests interleave.
    tokio::time::sleep(Duration::from_millis(20)).await;
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    describe_current()
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}
