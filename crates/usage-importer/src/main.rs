//! Usage Importer - Main entry point

use anyhow::Result;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;
use usage_common::logging::{init_logging, LogConfig};

use usage_importer::{
    config::Config,
    db::{self, DbConfig, PgBillingStore},
    gate::RunGate,
    health::HealthMonitor,
    importer::{ExecutionObserver, ImporterStep, LogObserver, MetricsObserver, VendorMapper},
    metrics::Metrics,
    routes::{self, AppState},
    steps::StepOptions,
};

const DEFAULT_LOG_FILTER: &str = "usage_importer=debug,usage_common=debug,tower_http=info,sqlx=warn";

#[tokio::main]
async fn main() -> Result<()> {
    let mut log_config = LogConfig::from_env()?;
    if log_config.filter_directives.is_none() {
        log_config.filter_directives = Some(DEFAULT_LOG_FILTER.to_string());
    }
    let _log_guard = init_logging(&log_config)?;

    info!("Starting usage importer");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        source_id = config.importer.source_id,
        step_type_id = config.importer.step_type_id,
        input_folder = %config.importer.input_folder.display(),
        "Configuration loaded"
    );

    let vendor = VendorMapper::load(&config.importer.vendor_mapper_path)?;

    let pool = db::create_pool(&DbConfig::from(&config.database)).await?;
    let store = Arc::new(PgBillingStore::new(pool));

    let metrics = Arc::new(Metrics::new());
    let observers: Vec<Arc<dyn ExecutionObserver>> = vec![
        Arc::new(LogObserver),
        Arc::new(MetricsObserver::new(metrics.clone())),
    ];
    let importer = ImporterStep::new(
        store.clone(),
        StepOptions::from(&config.importer),
        vendor,
        observers,
    )?;

    let health = HealthMonitor::new();
    let _health_handle = health.spawn(
        store.clone(),
        Duration::from_secs(config.health_check_interval_secs),
    );

    let state = AppState {
        runner: Arc::new(importer),
        gate: RunGate::new(),
        metrics,
        health,
    };
    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received terminate signal, starting graceful shutdown"),
    }

    // In-flight import runs are not cancelled
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
