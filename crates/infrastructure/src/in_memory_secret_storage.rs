use std::collections::BTreeMap;

use async_trait::async_trait;
use keyward_application::SecretStorage;
use keyward_core::AppResult;
use tokio::sync::RwLock;

/// In-memory broker storage for local runs without a database.
///
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct InMemorySecretStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemorySecretStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStorage for InMemorySecretStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_owned()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .filter_map(|key| key.strip_prefix(prefix))
            .map(str::to_owned)
            .collect())
    }
}
