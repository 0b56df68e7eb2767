use async_trait::async_trait;
use sqlx::{PgPool, Row};

use keyward_application::SecretStorage;
use keyward_core::{AppError, AppResult};

/// PostgreSQL-backed broker storage over a single key-value table.
#[derive(Clone)]
pub struct PostgresSecretStorage {
    pool: PgPool,
}

impl PostgresSecretStorage {
    /// Creates storage with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretStorage for PostgresSecretStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let row = sqlx::query(
            r#"
            SELECT value
            FROM broker_storage
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read entry '{key}': {error}")))?;

        row.map(|row| row.try_get::<Vec<u8>, _>("value"))
            .transpose()
            .map_err(|error| AppError::Internal(format!("failed to decode entry '{key}': {error}")))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO broker_storage (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to write entry '{key}': {error}")))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM broker_storage
            WHERE key = $1
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete entry '{key}': {error}")))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT substring(key FROM char_length($1) + 1) AS relative_key
            FROM broker_storage
            WHERE starts_with(key, $1)
            ORDER BY key COLLATE "C"
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list entries under '{prefix}': {error}"))
        })?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("relative_key"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| {
                AppError::Internal(format!("failed to decode entry key under '{prefix}': {error}"))
            })
    }
}

#[cfg(test)]
mod tests;
