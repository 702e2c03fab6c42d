//! Repair Desk HTTP server.
//!
//! Intake, tracking and status lookup for a repair shop.

use anyhow::Context;
use repair_desk_server::{build_router, telemetry, AppContext, Config};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();
    info!("Starting Repair Desk HTTP server");

    let config = Config::from_env()?;
    info!(
        backend = ?config.database.backend,
        qr_mode = ?config.qr.mode,
        metrics = config.server.metrics_enabled,
        "Configuration loaded"
    );

    let ctx = AppContext::build(&config)
        .await
        .context("Failed to initialize application context")?;
    let app = build_router(ctx.clone());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "HTTP server listening");

    let stopping = Arc::new(Notify::new());
    let notify = Arc::clone(&stopping);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                notify.notify_one();
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
        }
        () = stopping.notified() => {
            let grace = config.server.shutdown_timeout;
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!(timeout = ?grace, "In-flight requests did not finish in time");
                    server.abort();
                }
            }
        }
    }

    ctx.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
