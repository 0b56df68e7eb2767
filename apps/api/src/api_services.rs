use std::sync::Arc;

use keyward_application::{
    ConfigService, CredentialService, LeaseService, RoleService, SecretStorage,
};
use keyward_core::AppError;
use keyward_infrastructure::{
    InMemorySecretStorage, PostgresSecretStorage, RamIdentityPlatformConnector,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_config::ApiConfig;
use crate::state::AppState;

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

pub async fn run_migrations(config: &ApiConfig) -> Result<(), AppError> {
    let database_url = config.database_url.as_deref().ok_or_else(|| {
        AppError::Validation("DATABASE_URL is required to run migrations".to_owned())
    })?;
    connect_and_migrate(database_url).await?;
    Ok(())
}

pub async fn build_storage(config: &ApiConfig) -> Result<Arc<dyn SecretStorage>, AppError> {
    match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = connect_and_migrate(database_url).await?;
            info!("using postgres broker storage");
            Ok(Arc::new(PostgresSecretStorage::new(pool)))
        }
        None => {
            warn!("DATABASE_URL is not set; broker state is kept in memory and lost on restart");
            Ok(Arc::new(InMemorySecretStorage::new()))
        }
    }
}

pub fn build_app_state(
    config: &ApiConfig,
    storage: Arc<dyn SecretStorage>,
    shutdown: CancellationToken,
) -> Result<AppState, AppError> {
    let http_client = reqwest::Client::builder()
        .timeout(config.remote_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;
    let connector = Arc::new(RamIdentityPlatformConnector::new(
        http_client,
        config.ram_endpoint.clone(),
    )?);

    let config_service = ConfigService::new(storage.clone());
    let role_service = RoleService::new(storage.clone(), config.lease_limits);
    let credential_service =
        CredentialService::new(config_service.clone(), role_service.clone(), connector);
    let lease_service = LeaseService::new(credential_service, storage, config.lease_limits);

    Ok(AppState {
        config_service,
        role_service,
        lease_service,
        operator_token: Arc::from(config.operator_token.as_str()),
        shutdown,
    })
}
