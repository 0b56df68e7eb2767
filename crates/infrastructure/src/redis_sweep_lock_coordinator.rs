//! Redis-backed lock so only one worker sweeps expired leases at a time.

use async_trait::async_trait;
use keyward_application::{SweepLock, SweepLockCoordinator};
use keyward_core::{AppError, AppResult};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ExistenceCheck, Script, SetExpiry, SetOptions};
use tracing::debug;

/// Deletes the lock only while it still carries the caller's token.
const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Sweep lock stored as one expiring Redis key per scope.
///
/// The key is created with `SET NX EX` in a single command, so a worker
/// that dies right after acquiring never leaves a lock without expiry.
#[derive(Clone)]
pub struct RedisSweepLockCoordinator {
    client: redis::Client,
    key_prefix: String,
}

impl RedisSweepLockCoordinator {
    /// Creates a coordinator storing locks under `key_prefix`.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, scope_key: &str) -> String {
        format!("{}:{scope_key}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

fn validate_acquire(scope_key: &str, holder_id: &str, lock_seconds: u32) -> AppResult<()> {
    let problem = if scope_key.trim().is_empty() {
        "sweep lock scope must not be empty"
    } else if holder_id.trim().is_empty() {
        "sweep lock holder must not be empty"
    } else if lock_seconds == 0 {
        "sweep lock duration must be greater than zero"
    } else {
        return Ok(());
    };

    Err(AppError::Validation(problem.to_owned()))
}

fn acquire_options(lock_seconds: u32) -> SetOptions {
    SetOptions::default()
        .conditional_set(ExistenceCheck::NX)
        .with_expiration(SetExpiry::EX(u64::from(lock_seconds)))
}

#[async_trait]
impl SweepLockCoordinator for RedisSweepLockCoordinator {
    async fn try_acquire(
        &self,
        scope_key: &str,
        holder_id: &str,
        lock_seconds: u32,
    ) -> AppResult<Option<SweepLock>> {
        validate_acquire(scope_key, holder_id, lock_seconds)?;

        let key = self.key_for(scope_key);
        let token = format!("{holder_id}:{}", uuid::Uuid::new_v4());
        let mut connection = self.connection().await?;

        let reply: Option<String> = connection
            .set_options(key.as_str(), token.as_str(), acquire_options(lock_seconds))
            .await
            .map_err(|error| AppError::Internal(format!("failed to acquire sweep lock: {error}")))?;

        if reply.is_none() {
            debug!(scope = %scope_key, holder = %holder_id, "sweep lock held elsewhere");
            return Ok(None);
        }

        Ok(Some(SweepLock {
            scope_key: scope_key.to_owned(),
            token,
            holder_id: holder_id.to_owned(),
        }))
    }

    async fn release(&self, lock: &SweepLock) -> AppResult<()> {
        let mut connection = self.connection().await?;

        let deleted = Script::new(COMPARE_AND_DELETE)
            .key(self.key_for(lock.scope_key.as_str()))
            .arg(lock.token.as_str())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| AppError::Internal(format!("failed to release sweep lock: {error}")))?;

        if deleted == 0 {
            debug!(
                scope = %lock.scope_key,
                holder = %lock.holder_id,
                "sweep lock expired before release"
            );
        }

        Ok(())
    }
}
