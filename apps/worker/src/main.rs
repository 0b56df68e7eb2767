//! Keyward lease expiration worker.

#![forbid(unsafe_code)]

mod worker_config;

use std::sync::Arc;

use chrono::Utc;
use keyward_application::{
    ConfigService, CredentialService, LeaseService, RoleService, SweepLockCoordinator,
};
use keyward_core::{AppError, AppResult};
use keyward_infrastructure::{
    PostgresSecretStorage, RamIdentityPlatformConnector, RedisSweepLockCoordinator,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::worker_config::{WorkerConfig, init_tracing};

const SWEEP_LOCK_SCOPE: &str = "expired-leases";
const SWEEP_LOCK_KEY_PREFIX: &str = "keyward:sweep";

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let lease_service = build_lease_service(&config, pool)?;
    let lock_coordinator = build_lock_coordinator(config.redis_url.as_deref())?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
        signal_token.cancel();
    });

    info!(
        worker_id = %config.worker_id,
        sweep_interval_ms = config.sweep_interval.as_millis(),
        sweep_lock_seconds = config.sweep_lock_seconds,
        coordinated = lock_coordinator.is_some(),
        "keyward-worker started"
    );

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(config.sweep_interval) => {}
        }

        sweep_once(
            &config,
            &lease_service,
            lock_coordinator.as_deref(),
            &shutdown,
        )
        .await;
    }

    info!(worker_id = %config.worker_id, "keyward-worker stopped");
    Ok(())
}

async fn sweep_once(
    config: &WorkerConfig,
    lease_service: &LeaseService,
    lock_coordinator: Option<&dyn SweepLockCoordinator>,
    shutdown: &CancellationToken,
) {
    let lock = match lock_coordinator {
        Some(coordinator) => {
            match coordinator
                .try_acquire(
                    SWEEP_LOCK_SCOPE,
                    config.worker_id.as_str(),
                    config.sweep_lock_seconds,
                )
                .await
            {
                Ok(Some(lock)) => Some(lock),
                Ok(None) => return,
                Err(error) => {
                    warn!(
                        worker_id = %config.worker_id,
                        error = %error,
                        "failed to acquire sweep lock"
                    );
                    return;
                }
            }
        }
        None => None,
    };

    let sweep_token = shutdown.child_token();
    if let Err(error) = lease_service
        .revoke_expired(Utc::now(), &sweep_token)
        .await
    {
        warn!(
            worker_id = %config.worker_id,
            error = %error,
            "expired lease sweep failed"
        );
    }

    if let (Some(coordinator), Some(lock)) = (lock_coordinator, lock)
        && let Err(error) = coordinator.release(&lock).await
    {
        warn!(
            worker_id = %config.worker_id,
            error = %error,
            "failed to release sweep lock"
        );
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

fn build_lease_service(config: &WorkerConfig, pool: PgPool) -> AppResult<LeaseService> {
    let http_client = reqwest::Client::builder()
        .timeout(config.remote_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let connector = Arc::new(RamIdentityPlatformConnector::new(
        http_client,
        config.ram_endpoint.clone(),
    )?);

    let storage = Arc::new(PostgresSecretStorage::new(pool));
    let config_service = ConfigService::new(storage.clone());
    let role_service = RoleService::new(storage.clone(), config.lease_limits);
    let credential_service = CredentialService::new(config_service, role_service, connector);

    Ok(
        LeaseService::new(credential_service, storage, config.lease_limits)
            .with_revoke_retry_interval(config.sweep_interval),
    )
}

fn build_lock_coordinator(
    redis_url: Option<&str>,
) -> AppResult<Option<Arc<dyn SweepLockCoordinator>>> {
    let Some(redis_url) = redis_url else {
        warn!("REDIS_URL is not set; sweeping without cross-worker coordination");
        return Ok(None);
    };

    let client = redis::Client::open(redis_url)
        .map_err(|error| AppError::Internal(format!("invalid REDIS_URL: {error}")))?;

    Ok(Some(Arc::new(RedisSweepLockCoordinator::new(
        client,
        SWEEP_LOCK_KEY_PREFIX,
    ))))
}
