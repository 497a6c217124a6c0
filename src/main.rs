//! Demo server wired with the request tracing middleware.
//!
//! Serves a few routes behind [`TracingLayer`] so segments can be observed
//! end-to-end against a local trace daemon (or the log emitter).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::Path,
    http::StatusCode,
    routing::get,
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_tracing::config::{load_config, TracingConfig};
use request_tracing::{current_segment, TracingLayer};

#[derive(Parser, Debug)]
#[command(name = "request-tracing", about = "Traced demo HTTP server")]
struct Args {
    /// Path to a TOML tracing configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to serve on.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_tracing=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => TracingConfig {
            segment_name: "demo-service".to_string(),
            emitter: request_tracing::config::EmitterKind::Log,
            ..Default::default()
        },
    };

    tracing::info!(
        segment_name = %config.segment_name,
        mode = ?config.mode,
        emitter = ?config.emitter,
        "Configuration loaded"
    );

    if config.metrics_enabled {
        if let Ok(addr) = config.metrics_address.parse() {
            request_tracing::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // A missing segment name is fatal here, before the listener binds.
    let tracing_layer = TracingLayer::new(&config)?;

    let app = Router::new()
        .route("/", get(hello))
        .route("/status/{code}", get(status))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(tracing_layer)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn hello() -> &'static str {
    if let Some(segment) = current_segment() {
        segment.add_annotation("greeted", true);
    }
    "hello\n"
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
