//! Bean Route HTTP server.
//!
//! Serves quantity reports and records deliveries against `PostgreSQL`.

use anyhow::Context;
use bean_route_postgres::{PostgresInventoryLedger, PostgresOrderSource, connect, migrate};
use bean_route_web::{AppState, Config, build_router};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Bean Route server");

    let defaults = config
        .reports
        .defaults()
        .context("Invalid REPORT_DEFAULT_STATUS")?;
    info!(
        address = %config.server.address(),
        default_status = %config.reports.default_status,
        fallback_to_stored_total = config.reports.fallback_to_stored_total,
        "Configuration loaded"
    );

    let pool = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.connect_timeout(),
    )
    .await
    .context("Failed to connect to database")?;
    migrate(&pool).await?;
    info!("Database ready");

    let state = AppState::new(
        Arc::new(PostgresOrderSource::new(pool.clone())),
        Arc::new(PostgresInventoryLedger::new(pool)),
        defaults,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.address()))?;
    info!(address = %config.server.address(), "HTTP server listening for requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
