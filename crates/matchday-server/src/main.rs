//! Matchday Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use matchday_common::logging::{init_logging, LogConfig};
use matchday_ingest::storage::MemoryStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use matchday_server::{
    api::{self, AppState},
    config::Config,
    services::Services,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .log_file_prefix("matchday-server")
        .filter_directives("matchday_server=debug,matchday_ingest=info,tower_http=debug")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Matchday Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = Arc::new(MemoryStore::new());
    let services = Services::build(&config.ingest, store)?;

    let cancel = CancellationToken::new();
    let scheduler_handles = if config.ingest.enabled {
        let handles = services.scheduler(&config.ingest, cancel.clone())?.start();
        info!(
            ingest_cron = %config.ingest.schedule.ingest_cron,
            notify_cron = %config.ingest.schedule.notify_cron,
            "Scheduled drivers started"
        );
        handles
    } else {
        info!("Ingestion is disabled (INGEST_ENABLED=false)");
        Vec::new()
    };

    if config.server.admin_token.is_none() {
        warn!("MATCHDAY_ADMIN_TOKEN is not set, manual ingestion triggers are refused");
    }

    let state = AppState {
        governor: services.governor.clone(),
        ingestion: services.ingestion.clone(),
        admin_token: config.server.admin_token.clone(),
    };
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // Stop the drivers and give in-progress runs a bounded time to unwind
    cancel.cancel();
    let drain = futures::future::join_all(scheduler_handles);
    if tokio::time::timeout(Duration::from_secs(config.server.shutdown_timeout_secs), drain)
        .await
        .is_err()
    {
        warn!("Scheduled drivers did not stop within the shutdown timeout");
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(cancel: CancellationToken) {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    cancel.cancel();
}
