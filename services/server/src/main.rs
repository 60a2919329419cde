//! vaxishare server
//!
//! Serves the dose-allocation API over HTTP and, when configured, drives
//! allocation cycles on a fixed interval.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vaxishare_server::{api, config, seed, state::AppState, worker::CycleWorker};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to VAXI_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting vaxishare server");
    info!(listen_addr = %config.listen_addr, "Configuration loaded");

    let scheduler = seed::bootstrap(&config).context("failed to bootstrap allocator")?;

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the cycle worker only when an interval is configured
    let worker_handle = config.cycle_interval.map(|interval| {
        let worker = CycleWorker::new(scheduler.clone(), config.cycle_policy, interval);
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            worker.run(shutdown_rx).await;
        })
    });

    // Create application state
    let state = match config.frontend_dir.clone() {
        Some(dir) => {
            info!(frontend_dir = %dir.display(), "Serving static front end");
            AppState::with_frontend_dir(scheduler, dir)
        }
        None => AppState::new(scheduler),
    };

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    // Spawn the server with graceful shutdown
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    // Signal shutdown to the worker and server
    let _ = shutdown_tx.send(true);

    if let Some(handle) = worker_handle {
        info!("Waiting for cycle worker to shut down...");
        if let Err(e) = tokio::time::timeout(Duration::from_secs(10), handle).await {
            warn!(error = %e, "Cycle worker did not shut down in time");
        }
    }

    info!("vaxishare server shutdown complete");
    Ok(())
}
