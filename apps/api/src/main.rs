//! Keyward API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use keyward_core::AppError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    if config.migrate_only {
        api_services::run_migrations(&config).await?;
        info!("database migrations applied successfully");
        return Ok(());
    }

    let storage = api_services::build_storage(&config).await?;
    let shutdown = CancellationToken::new();
    let app_state = api_services::build_app_state(&config, storage, shutdown.clone())?;
    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "keyward-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(error = %error, "failed to listen for shutdown signal");
            }
            info!("shutdown requested; cancelling in-flight credential pipelines");
            shutdown.cancel();
        })
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
