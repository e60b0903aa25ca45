mod api;
mod config;
mod engine;
mod error;
mod lookup;
mod models;
mod observability;
mod publisher;
mod state;
mod store;

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (app_state, trip_rx) = state::AppState::new(&config);
    let shared_state = Arc::new(app_state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatch_loop = tokio::spawn(engine::coordinator::run_dispatch_loop(
        shared_state.clone(),
        trip_rx,
        shutdown_rx,
    ));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    // stop pulling new trip events; an in-flight dispatch finishes first
    let _ = shutdown_tx.send(true);
    if let Err(err) = dispatch_loop.await {
        tracing::error!(error = %err, "dispatch loop terminated abnormally");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
