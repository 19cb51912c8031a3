//! ChurnIQ - Main Entry Point
//!
//! Loads the classifier and feature schema once, then serves the dashboard or
//! runs a one-shot scoring command.

use anyhow::{Context, Result};
use churniq::{
    batch::UploadedTable,
    cli::{Args, Command},
    config::{AppConfig, LoggingConfig},
    metrics::{DashboardMetrics, MetricsReporter},
    models::inference::InferenceEngine,
    web::{self, AppState},
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Configuration loaded successfully");

    // Artifacts are loaded once; any failure here is fatal
    let engine = InferenceEngine::new(&config).context("Failed to load model artifacts")?;

    match args.command() {
        Command::Serve => serve(config, engine).await,
        command @ Command::Predict { .. } => {
            let signals = command
                .customer_signals()
                .context("predict command without customer signals")?;
            let assessment = engine.predict_single(&signals)?;
            println!("{}", serde_json::to_string_pretty(&assessment)?);
            Ok(())
        }
        Command::Score { input, output } => score_file(&engine, &input, &output),
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},tower_http=debug", logging.level)))
        .context("Invalid logging.level")?;

    // stdout is reserved for command output such as `predict` JSON
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

async fn serve(config: AppConfig, engine: InferenceEngine) -> Result<()> {
    info!("Starting ChurnIQ dashboard");

    let metrics = Arc::new(DashboardMetrics::new());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let max_upload_bytes = config.max_upload_bytes();
    let state = Arc::new(AppState::new(engine, metrics.clone(), config.scoring.clone()));
    let app = web::app(state, max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        max_upload_bytes = ?max_upload_bytes,
        "Dashboard listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Score a CSV file offline and write the scored table to `output`
fn score_file(engine: &InferenceEngine, input: &Path, output: &Path) -> Result<()> {
    let table = UploadedTable::from_path(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let report = engine.predict_batch(table)?;
    let csv = report.to_csv()?;
    std::fs::write(output, csv).with_context(|| format!("Failed to write {}", output.display()))?;

    let counts = report.bucket_counts();
    info!(
        rows = report.row_count(),
        low = counts.low,
        medium = counts.medium,
        high = counts.high,
        output = %output.display(),
        "Scored CSV written"
    );
    Ok(())
}
