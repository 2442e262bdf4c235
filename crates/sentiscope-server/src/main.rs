//! Sentiscope Server
//!
//! Loads every sentiment backend once at startup and serves predictions with
//! word-importance explanations over HTTP.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use sentiscope_models::{ModelRegistry, SharedRegistry};
use sentiscope_server::{create_router, AppState, Cli, Orchestrator, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting Sentiscope server");

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Artifact store: {}", config.models.artifacts_dir.display());
    info!("Explanation budget: {}ms", config.explanation_budget_ms);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Load the registry off the async runtime; neural backends read large files
    info!("Loading model registry...");
    let models = config.models.clone();
    let registry = tokio::task::spawn_blocking(move || ModelRegistry::load(models)).await??;
    let shared = SharedRegistry::new(registry);
    info!("Normalizer mode: {:?}", shared.registry().normalizer_mode());

    let state = AppState {
        orchestrator: Orchestrator::new(shared.clone_arc(), config.explanation_budget()),
        config: Arc::new(config.clone()),
        metrics_handle,
    };

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Sentiscope listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new(
            "sentiscope_core=debug,sentiscope_models=debug,sentiscope_server=debug,tower_http=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("sentiscope_core=info,sentiscope_models=info,sentiscope_server=info")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "sentiscope_predictions_total",
        "Total number of predictions served by backend"
    );
    metrics::describe_counter!(
        "sentiscope_explanation_fallbacks_total",
        "Explanations that fell back to the lexicon heuristic or ran out of budget"
    );
    metrics::describe_histogram!(
        "sentiscope_inference_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds by backend"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
