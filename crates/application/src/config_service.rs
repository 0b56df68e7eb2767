use std::sync::Arc;

use keyward_core::{AppError, AppResult};
use keyward_domain::UpstreamCredential;

use crate::storage_ports::{CONFIG_KEY, SecretStorage, read_json, write_json};

/// Readable projection of the upstream configuration.
///
/// The secret key is never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfigView {
    /// Access key id the broker uses upstream.
    pub access_key: String,
}

/// Application service for the broker's own upstream credentials.
#[derive(Clone)]
pub struct ConfigService {
    storage: Arc<dyn SecretStorage>,
}

impl ConfigService {
    /// Creates a config service over broker storage.
    #[must_use]
    pub fn new(storage: Arc<dyn SecretStorage>) -> Self {
        Self { storage }
    }

    /// Replaces the upstream credentials.
    ///
    /// Both halves are required; there is no partial update because a new
    /// secret key always comes with a new access key.
    pub async fn write_upstream(
        &self,
        access_key: Option<String>,
        secret_key: Option<String>,
    ) -> AppResult<()> {
        let access_key =
            access_key.ok_or_else(|| AppError::Validation("access_key is required".to_owned()))?;
        let secret_key =
            secret_key.ok_or_else(|| AppError::Validation("secret_key is required".to_owned()))?;
        let upstream = UpstreamCredential::new(access_key, secret_key)?;

        write_json(self.storage.as_ref(), CONFIG_KEY, &upstream).await
    }

    /// Returns the configured access key, if any.
    pub async fn read_upstream(&self) -> AppResult<Option<UpstreamConfigView>> {
        let upstream = read_json::<UpstreamCredential>(self.storage.as_ref(), CONFIG_KEY).await?;

        Ok(upstream.map(|upstream| UpstreamConfigView {
            access_key: upstream.access_key().to_owned(),
        }))
    }

    /// Removes the upstream credentials.
    pub async fn delete_upstream(&self) -> AppResult<()> {
        self.storage.delete(CONFIG_KEY).await
    }

    /// Loads the upstream credentials needed to call the identity platform.
    pub async fn load_upstream(&self) -> AppResult<UpstreamCredential> {
        read_json::<UpstreamCredential>(self.storage.as_ref(), CONFIG_KEY)
            .await?
            .ok_or(AppError::UpstreamNotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keyward_core::AppError;

    use super::ConfigService;
    use crate::test_support::MemoryStorage;

    #[tokio::test]
    async fn read_never_returns_secret_key() {
        let storage = Arc::new(MemoryStorage::default());
        let service = ConfigService::new(storage.clone());

        let written = service
            .write_upstream(Some("LTAIroot".to_owned()), Some("root-secret".to_owned()))
            .await;
        assert!(written.is_ok());

        let view = service.read_upstream().await;
        assert!(view.is_ok());
        let view = view.unwrap_or_default();
        assert_eq!(
            view.map(|view| view.access_key),
            Some("LTAIroot".to_owned())
        );
    }

    #[tokio::test]
    async fn write_requires_both_fields() {
        let service = ConfigService::new(Arc::new(MemoryStorage::default()));

        let missing_secret = service
            .write_upstream(Some("LTAIroot".to_owned()), None)
            .await;
        assert!(matches!(
            missing_secret,
            Err(AppError::Validation(message)) if message == "secret_key is required"
        ));

        let missing_access = service
            .write_upstream(None, Some("root-secret".to_owned()))
            .await;
        assert!(matches!(
            missing_access,
            Err(AppError::Validation(message)) if message == "access_key is required"
        ));
    }

    #[tokio::test]
    async fn load_without_config_is_not_configured() {
        let service = ConfigService::new(Arc::new(MemoryStorage::default()));

        let loaded = service.load_upstream().await;
        assert!(matches!(loaded, Err(AppError::UpstreamNotConfigured)));
    }

    #[tokio::test]
    async fn delete_clears_config() {
        let service = ConfigService::new(Arc::new(MemoryStorage::default()));
        let written = service
            .write_upstream(Some("LTAIroot".to_owned()), Some("root-secret".to_owned()))
            .await;
        assert!(written.is_ok());

        assert!(service.delete_upstream().await.is_ok());
        assert!(matches!(
            service.read_upstream().await,
            Ok(None)
        ));
    }
}
