use async_trait::async_trait;
use keyward_core::{AppError, AppResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage key holding the broker's upstream credentials.
pub const CONFIG_KEY: &str = "config";

/// Storage prefix for per-group role entries.
pub const ROLE_PREFIX: &str = "role/";

/// Storage prefix for issued lease records.
pub const LEASE_PREFIX: &str = "lease/";

/// Key-value storage port for broker state.
#[async_trait]
pub trait SecretStorage: Send + Sync {
    /// Returns the value stored at `key`, if any.
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Stores `value` at `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Lists keys under `prefix`, relative to the prefix, in lexical order.
    async fn list(&self, prefix: &str) -> AppResult<Vec<String>>;
}

/// Reads and decodes a JSON value stored at `key`.
pub async fn read_json<T>(storage: &dyn SecretStorage, key: &str) -> AppResult<Option<T>>
where
    T: DeserializeOwned,
{
    let Some(bytes) = storage.get(key).await? else {
        return Ok(None);
    };

    serde_json::from_slice(bytes.as_slice())
        .map(Some)
        .map_err(|error| AppError::Internal(format!("failed to decode entry '{key}': {error}")))
}

/// Encodes `value` as JSON and stores it at `key`.
pub async fn write_json<T>(storage: &dyn SecretStorage, key: &str, value: &T) -> AppResult<()>
where
    T: Serialize + Sync,
{
    let bytes = serde_json::to_vec(value)
        .map_err(|error| AppError::Internal(format!("failed to encode entry '{key}': {error}")))?;

    storage.put(key, bytes).await
}
