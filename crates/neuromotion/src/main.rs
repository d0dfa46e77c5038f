use anyhow::{Context, Result};
use clap::Parser;
use neuroconf::CaptureConfig;
use neuromotion::session::RecordingSession;
use neuromotion::web;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Neuromotion Capture server
///
/// Collects EMG signals from a Myo armband and hand landmarks from the
/// MediaPipe hand landmarker simultaneously, for dataset creation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port the server will be served at (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory where data recordings are saved (overrides config)
    #[arg(short, long)]
    records_path: Option<PathBuf>,

    /// Config file to use instead of ./neuromotion.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CaptureConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let port = cli.port.unwrap_or(config.bind.http_port);
    let records_dir = cli
        .records_path
        .unwrap_or_else(|| config.paths.records_dir.clone());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("neuromotion {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("records directory: {}", records_dir.display());

    let state = web::AppState {
        session: Arc::new(Mutex::new(RecordingSession::new())),
        records_dir: Arc::new(records_dir),
    };
    let app = web::router(state);

    let addr: std::net::SocketAddr = format!("0.0.0.0:{port}")
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind port {port} - is it already in use?"))?;

    tracing::info!("Capture UI:    http://{addr}/");
    tracing::info!("Start signal:  POST http://{addr}/startRecording");
    tracing::info!("Save signal:   POST http://{addr}/saveRecording");
    tracing::info!("Sample stream: ws://{addr}/streamRecordingToMemory");
    tracing::info!("Health:        GET http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM (systemd, cargo-watch, etc.).
async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
