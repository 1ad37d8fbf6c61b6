//! Picket Server — listener control plane.
//!
//! Loads listener modules, restarts the listeners recorded by an earlier run
//! and keeps them up until the process is asked to stop.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt};

use picket_core::config::AppConfig;
use picket_core::error::{AppError, ErrorKind};
use picket_listener::LifecycleController;

#[tokio::main]
async fn main() {
    let env = std::env::var("PICKET_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Picket v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Listener store ───────────────────────────────────
    let store = picket_database::connect_store(&config).await?;

    // ── Step 2: Listener modules ─────────────────────────────────
    let factories = plugin_tcp::factories()?;
    let directory = Path::new(&config.listeners.directory);
    let controller = LifecycleController::load(directory, &factories, store)?;

    let modules = controller.loaded_modules().await;
    tracing::info!(
        directory = %directory.display(),
        modules = ?modules,
        "Listener modules ready"
    );

    // ── Step 3: Recovery ─────────────────────────────────────────
    if config.listeners.auto_recover {
        let report = controller.recover_all().await?;
        tracing::info!(
            recovered = report.recovered.len(),
            orphaned = report.count(ErrorKind::OrphanRecord),
            undecodable = report.count(ErrorKind::Serialization),
            failed_to_start = report.count(ErrorKind::StartFailure),
            "Listeners recovered"
        );
    } else {
        tracing::info!("Listener recovery disabled");
    }

    // ── Step 4: Wait for shutdown ────────────────────────────────
    tracing::info!("Picket is running");
    shutdown_signal().await;

    tracing::info!("Shutdown signal received, stopping listeners...");
    let stopped = controller.shutdown_all().await;
    tracing::info!(count = stopped.len(), "Picket stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
