use std::sync::Arc;

use keyward_core::{AppError, AppResult};
use keyward_domain::{GroupName, RoleEntry, RoleEntryPatch, SystemLeaseLimits};
use tracing::{info, warn};

use crate::storage_ports::{ROLE_PREFIX, SecretStorage, read_json, write_json};

mod locks;

use locks::KeyedLocks;

/// Result of a successful role write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleWriteOutcome {
    /// Entry as persisted.
    pub entry: RoleEntry,
    /// Non-fatal notices for the operator.
    pub warnings: Vec<String>,
}

/// Application service for per-group TTL policy.
#[derive(Clone)]
pub struct RoleService {
    storage: Arc<dyn SecretStorage>,
    limits: SystemLeaseLimits,
    locks: Arc<KeyedLocks>,
}

impl RoleService {
    /// Creates a role service.
    #[must_use]
    pub fn new(storage: Arc<dyn SecretStorage>, limits: SystemLeaseLimits) -> Self {
        Self {
            storage,
            limits,
            locks: Arc::new(KeyedLocks::default()),
        }
    }

    /// Creates or updates the role for `group_name`.
    ///
    /// A missing role starts from zero TTLs; validation runs on the merged
    /// entry.
    pub async fn write_role(
        &self,
        group_name: &GroupName,
        patch: RoleEntryPatch,
    ) -> AppResult<RoleWriteOutcome> {
        self.merge_and_persist(group_name, patch, false).await
    }

    /// Updates an existing role, failing with `NotFound` when absent.
    pub async fn update_role(
        &self,
        group_name: &GroupName,
        patch: RoleEntryPatch,
    ) -> AppResult<RoleWriteOutcome> {
        self.merge_and_persist(group_name, patch, true).await
    }

    /// Returns the role for `group_name`, if any.
    pub async fn read_role(&self, group_name: &GroupName) -> AppResult<Option<RoleEntry>> {
        read_json(self.storage.as_ref(), role_key(group_name).as_str()).await
    }

    /// Deletes the role. Issued credentials keep their leases.
    pub async fn delete_role(&self, group_name: &GroupName) -> AppResult<()> {
        let guard = self.locks.lock(group_name.as_str()).await;
        let result = self.storage.delete(role_key(group_name).as_str()).await;
        guard.unlock().await;

        if result.is_ok() {
            info!(group = %group_name, "role deleted");
        }
        result
    }

    /// Lists every group with a stored role.
    pub async fn list_roles(&self) -> AppResult<Vec<String>> {
        self.storage.list(ROLE_PREFIX).await
    }

    async fn merge_and_persist(
        &self,
        group_name: &GroupName,
        patch: RoleEntryPatch,
        require_existing: bool,
    ) -> AppResult<RoleWriteOutcome> {
        let guard = self.locks.lock(group_name.as_str()).await;
        let result = self
            .merge_and_persist_locked(group_name, patch, require_existing)
            .await;
        guard.unlock().await;
        result
    }

    async fn merge_and_persist_locked(
        &self,
        group_name: &GroupName,
        patch: RoleEntryPatch,
        require_existing: bool,
    ) -> AppResult<RoleWriteOutcome> {
        let key = role_key(group_name);
        let existing = read_json::<RoleEntry>(self.storage.as_ref(), key.as_str()).await?;

        if require_existing && existing.is_none() {
            return Err(AppError::NotFound(format!(
                "role for group '{group_name}' does not exist"
            )));
        }

        let entry = existing.unwrap_or_default().merged(patch)?;
        write_json(self.storage.as_ref(), key.as_str(), &entry).await?;

        let mut warnings = Vec::new();
        if entry.ttl() > self.limits.max_lease_ttl() {
            warnings.push(format!(
                "ttl of {}s exceeds the system max lease ttl of {}s; the system maximum will govern issued leases",
                entry.ttl().as_secs(),
                self.limits.max_lease_ttl().as_secs()
            ));
            warn!(
                group = %group_name,
                ttl_seconds = entry.ttl().as_secs(),
                "role ttl exceeds system max lease ttl"
            );
        }

        info!(
            group = %group_name,
            ttl_seconds = entry.ttl().as_secs(),
            max_ttl_seconds = entry.max_ttl().as_secs(),
            "role written"
        );

        Ok(RoleWriteOutcome { entry, warnings })
    }
}

fn role_key(group_name: &GroupName) -> String {
    format!("{ROLE_PREFIX}{group_name}")
}
