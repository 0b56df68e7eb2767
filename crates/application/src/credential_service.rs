use std::sync::Arc;

use keyward_core::{
    AppError, AppResult, CleanupFailure, ProvisioningFailure, ProvisioningStep, RevocationFailure,
    RevocationStep,
};
use keyward_domain::{
    AccessKey, GroupName, IssuedCredential, LeaseMetadata, LeaseTerms, RoleEntry,
    generate_username,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config_service::ConfigService;
use crate::identity_ports::{IdentityPlatform, IdentityPlatformConnector};
use crate::role_service::RoleService;

mod issue;
mod renew;
mod revoke;
mod saga;

/// Application service driving the credential lifecycle against the identity
/// platform: issue, renew and revoke.
///
/// Every remote call is awaited in sequence. Nothing is retried; callers stop
/// a run through the [`CancellationToken`] they pass in.
#[derive(Clone)]
pub struct CredentialService {
    config_service: ConfigService,
    role_service: RoleService,
    connector: Arc<dyn IdentityPlatformConnector>,
}

impl CredentialService {
    /// Creates a credential service.
    #[must_use]
    pub fn new(
        config_service: ConfigService,
        role_service: RoleService,
        connector: Arc<dyn IdentityPlatformConnector>,
    ) -> Self {
        Self {
            config_service,
            role_service,
            connector,
        }
    }

    async fn platform(&self) -> AppResult<Arc<dyn IdentityPlatform>> {
        let upstream = self.config_service.load_upstream().await?;
        self.connector.connect(&upstream)
    }

    async fn load_role(&self, group_name: &GroupName) -> AppResult<Option<RoleEntry>> {
        self.role_service
            .read_role(group_name)
            .await
            .map_err(|error| {
                AppError::RolePolicyLoadFailed(format!("role for group '{group_name}': {error}"))
            })
    }
}

/// Strips the variant prefix from platform errors so failure reports carry the
/// platform's own text.
fn remote_message(error: AppError) -> String {
    match error {
        AppError::Remote(message) => message,
        other => other.to_string(),
    }
}
