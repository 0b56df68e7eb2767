use async_trait::async_trait;
use keyward_core::AppResult;

/// Exclusive claim on one sweep scope, held by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepLock {
    /// Logical scope the lock covers.
    pub scope_key: String,
    /// Unique token used for compare-and-delete release.
    pub token: String,
    /// Worker that holds the lock.
    pub holder_id: String,
}

/// Distributed coordination port so only one worker sweeps expired leases.
#[async_trait]
pub trait SweepLockCoordinator: Send + Sync {
    /// Attempts to acquire the lock; `None` when another worker holds it.
    async fn try_acquire(
        &self,
        scope_key: &str,
        holder_id: &str,
        lock_seconds: u32,
    ) -> AppResult<Option<SweepLock>>;

    /// Releases the lock if it is still held with the same token.
    async fn release(&self, lock: &SweepLock) -> AppResult<()>;
}
