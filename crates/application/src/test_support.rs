//! Fakes shared by application service tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use keyward_core::{AppError, AppResult};
use keyward_domain::{AccessKey, GroupName, UpstreamCredential};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::identity_ports::{IdentityPlatform, IdentityPlatformConnector};
use crate::storage_ports::SecretStorage;

#[derive(Default)]
pub(crate) struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_read_prefix: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub(crate) async fn fail_reads_under(&self, prefix: &str) {
        *self.failing_read_prefix.lock().await = Some(prefix.to_owned());
    }

    pub(crate) async fn fail_writes(&self) {
        *self.fail_writes.lock().await = true;
    }

    pub(crate) async fn keys(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl SecretStorage for MemoryStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let failing = self
            .failing_read_prefix
            .lock()
            .await
            .as_deref()
            .is_some_and(|prefix| key.starts_with(prefix));
        if failing {
            return Err(AppError::Internal("simulated storage read failure".to_owned()));
        }

        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> AppResult<()> {
        if *self.fail_writes.lock().await {
            return Err(AppError::Internal("simulated storage write failure".to_owned()));
        }

        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .await
            .keys()
            .filter_map(|key| key.strip_prefix(prefix))
            .map(str::to_owned)
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlatformCall {
    CreateIdentity { name: String },
    DeleteIdentity { name: String },
    AddToGroup { name: String, group: String },
    RemoveFromGroup { name: String, group: String },
    CreateAccessKey { name: String },
    DeleteAccessKey { name: String, access_key_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PlatformOperation {
    CreateIdentity,
    DeleteIdentity,
    AddToGroup,
    RemoveFromGroup,
    CreateAccessKey,
    DeleteAccessKey,
}

/// Records every call and fails the operations it was told to fail.
#[derive(Default)]
pub(crate) struct FakeIdentityPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    failing: Mutex<HashSet<PlatformOperation>>,
    cancel_on_failure: Mutex<Option<CancellationToken>>,
    cancel_after: Mutex<Option<(PlatformOperation, CancellationToken)>>,
}

impl FakeIdentityPlatform {
    pub(crate) async fn fail(&self, operation: PlatformOperation) {
        self.failing.lock().await.insert(operation);
    }

    pub(crate) async fn recover(&self, operation: PlatformOperation) {
        self.failing.lock().await.remove(&operation);
    }

    /// Cancels `token` once `operation` has succeeded.
    pub(crate) async fn cancel_after(&self, operation: PlatformOperation, token: CancellationToken) {
        *self.cancel_after.lock().await = Some((operation, token));
    }

    /// Cancels `token` whenever an operation fails, as an impatient caller would.
    pub(crate) async fn cancel_on_failure(&self, token: CancellationToken) {
        *self.cancel_on_failure.lock().await = Some(token);
    }

    pub(crate) async fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, operation: PlatformOperation, call: PlatformCall) -> AppResult<()> {
        self.calls.lock().await.push(call);

        if self.failing.lock().await.contains(&operation) {
            if let Some(token) = self.cancel_on_failure.lock().await.as_ref() {
                token.cancel();
            }
            return Err(AppError::Remote(format!(
                "simulated {operation:?} failure"
            )));
        }

        if let Some((after, token)) = self.cancel_after.lock().await.as_ref()
            && *after == operation
        {
            token.cancel();
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityPlatform for FakeIdentityPlatform {
    async fn create_identity(&self, name: &str, _display_name: &str) -> AppResult<()> {
        self.record(
            PlatformOperation::CreateIdentity,
            PlatformCall::CreateIdentity {
                name: name.to_owned(),
            },
        )
        .await
    }

    async fn delete_identity(&self, name: &str) -> AppResult<()> {
        self.record(
            PlatformOperation::DeleteIdentity,
            PlatformCall::DeleteIdentity {
                name: name.to_owned(),
            },
        )
        .await
    }

    async fn add_to_group(&self, name: &str, group_name: &GroupName) -> AppResult<()> {
        self.record(
            PlatformOperation::AddToGroup,
            PlatformCall::AddToGroup {
                name: name.to_owned(),
                group: group_name.as_str().to_owned(),
            },
        )
        .await
    }

    async fn remove_from_group(&self, name: &str, group_name: &GroupName) -> AppResult<()> {
        self.record(
            PlatformOperation::RemoveFromGroup,
            PlatformCall::RemoveFromGroup {
                name: name.to_owned(),
                group: group_name.as_str().to_owned(),
            },
        )
        .await
    }

    async fn create_access_key(&self, name: &str) -> AppResult<AccessKey> {
        self.record(
            PlatformOperation::CreateAccessKey,
            PlatformCall::CreateAccessKey {
                name: name.to_owned(),
            },
        )
        .await?;

        Ok(AccessKey::new(format!("LTAI-{name}"), "minted-secret"))
    }

    async fn delete_access_key(&self, name: &str, access_key_id: &str) -> AppResult<()> {
        self.record(
            PlatformOperation::DeleteAccessKey,
            PlatformCall::DeleteAccessKey {
                name: name.to_owned(),
                access_key_id: access_key_id.to_owned(),
            },
        )
        .await
    }
}

pub(crate) struct FakeConnector {
    pub(crate) platform: Arc<FakeIdentityPlatform>,
}

impl IdentityPlatformConnector for FakeConnector {
    fn connect(&self, _upstream: &UpstreamCredential) -> AppResult<Arc<dyn IdentityPlatform>> {
        Ok(self.platform.clone())
    }
}

pub(crate) fn group(name: &str) -> GroupName {
    GroupName::new(name).unwrap_or_else(|_| unreachable!())
}
