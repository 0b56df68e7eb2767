use std::sync::Arc;

use async_trait::async_trait;
use keyward_core::AppResult;
use keyward_domain::{AccessKey, GroupName, UpstreamCredential};

/// Remote identity platform operations used by the credential lifecycle.
///
/// Each call is independent; the platform offers no batch or transactional
/// variant. Failures surface as [`keyward_core::AppError::Remote`].
#[async_trait]
pub trait IdentityPlatform: Send + Sync {
    /// Creates an identity named `name`.
    async fn create_identity(&self, name: &str, display_name: &str) -> AppResult<()>;

    /// Deletes the identity named `name`.
    async fn delete_identity(&self, name: &str) -> AppResult<()>;

    /// Adds the identity to an existing group.
    async fn add_to_group(&self, name: &str, group_name: &GroupName) -> AppResult<()>;

    /// Removes the identity from a group.
    async fn remove_from_group(&self, name: &str, group_name: &GroupName) -> AppResult<()>;

    /// Mints a new access key pair for the identity.
    async fn create_access_key(&self, name: &str) -> AppResult<AccessKey>;

    /// Deletes one access key belonging to the identity.
    async fn delete_access_key(&self, name: &str, access_key_id: &str) -> AppResult<()>;
}

/// Builds platform clients from the broker's stored upstream credentials.
pub trait IdentityPlatformConnector: Send + Sync {
    /// Returns a client authenticated with `upstream`.
    fn connect(&self, upstream: &UpstreamCredential) -> AppResult<Arc<dyn IdentityPlatform>>;
}
