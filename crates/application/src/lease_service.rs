use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use keyward_core::{AppError, AppResult, LeaseId, RevocationStep};
use keyward_domain::{AccessKey, GroupName, LeaseTerms, SystemLeaseLimits};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::credential_service::CredentialService;
use crate::storage_ports::{LEASE_PREFIX, SecretStorage, read_json, write_json};

mod sweep;

pub use sweep::SweepReport;

/// Upper bound on the wait between failed revocation attempts of one lease.
pub const MAX_REVOKE_BACKOFF: Duration = Duration::from_secs(3600);

/// Default wait after the first failed revocation attempt.
pub const DEFAULT_REVOKE_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Persisted state of one issued credential lease.
///
/// The access key secret is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Lease identifier.
    pub lease_id: LeaseId,
    /// Group the credential was issued against.
    pub group_name: GroupName,
    /// Opaque metadata replayed on renew and revoke.
    pub internal_data: Map<String, Value>,
    /// TTL overrides currently applied to the lease.
    pub terms: LeaseTerms,
    /// Issuance time; the max TTL counts from here.
    pub issued_at: DateTime<Utc>,
    /// Time after which the sweeper revokes the lease.
    pub expires_at: DateTime<Utc>,
    /// Failed revocation attempts so far.
    #[serde(default)]
    pub revoke_attempts: u32,
    /// Error of the last failed revocation attempt.
    #[serde(default)]
    pub last_revoke_error: Option<String>,
    /// Earliest time the sweeper retries a failed revocation.
    #[serde(default)]
    pub next_revoke_at: Option<DateTime<Utc>>,
    /// Last teardown step that succeeded; retries resume after it.
    #[serde(default)]
    pub revoked_through: Option<RevocationStep>,
}

/// Credential handed to the requester at issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLease {
    /// Lease identifier used to renew or revoke.
    pub lease_id: LeaseId,
    /// Minted access key, secret included.
    pub access_key: AccessKey,
    /// Granted lease duration.
    pub lease_duration: Duration,
    /// Longest the lease can live counting renewals.
    pub lease_max_duration: Duration,
    /// Whether renewing can still extend the lease.
    pub renewable: bool,
}

/// Application service owning lease records around the credential lifecycle.
#[derive(Clone)]
pub struct LeaseService {
    credentials: CredentialService,
    storage: Arc<dyn SecretStorage>,
    limits: SystemLeaseLimits,
    revoke_retry_interval: Duration,
}

impl LeaseService {
    /// Creates a lease service.
    #[must_use]
    pub fn new(
        credentials: CredentialService,
        storage: Arc<dyn SecretStorage>,
        limits: SystemLeaseLimits,
    ) -> Self {
        Self {
            credentials,
            storage,
            limits,
            revoke_retry_interval: DEFAULT_REVOKE_RETRY_INTERVAL,
        }
    }

    /// Sets the base wait between failed revocation attempts.
    #[must_use]
    pub fn with_revoke_retry_interval(mut self, interval: Duration) -> Self {
        self.revoke_retry_interval = interval;
        self
    }

    /// Issues a credential for `group_name` and records its lease.
    pub async fn issue(
        &self,
        display_name: &str,
        group_name: &GroupName,
        cancel: &CancellationToken,
    ) -> AppResult<IssuedLease> {
        let issued = self
            .credentials
            .issue(display_name, group_name, cancel)
            .await?;

        let issued_at = Utc::now();
        let lease_duration = self.limits.effective_ttl(&issued.terms);
        let lease_max_duration = self.limits.effective_max_ttl(&issued.terms);
        let max_expiry = issued_at + to_delta(lease_max_duration)?;
        let expires_at = (issued_at + to_delta(lease_duration)?).min(max_expiry);

        let record = LeaseRecord {
            lease_id: LeaseId::new(),
            group_name: group_name.clone(),
            internal_data: issued.metadata.to_internal_data(),
            terms: issued.terms,
            issued_at,
            expires_at,
            revoke_attempts: 0,
            last_revoke_error: None,
            next_revoke_at: None,
            revoked_through: None,
        };

        if let Err(persist_error) = self.save(&record).await {
            error!(
                lease_id = %record.lease_id,
                error = %persist_error,
                "failed to persist lease; revoking issued credential"
            );
            // The caller's token may already be cancelled; this cleanup must still run.
            if let Err(revoke_error) = self
                .credentials
                .revoke(&record.internal_data, &CancellationToken::new())
                .await
            {
                error!(
                    lease_id = %record.lease_id,
                    error = %revoke_error,
                    "revocation of unrecorded credential failed"
                );
            }
            return Err(persist_error);
        }

        info!(
            lease_id = %record.lease_id,
            group = %group_name,
            ttl_seconds = lease_duration.as_secs(),
            "lease issued"
        );

        Ok(IssuedLease {
            lease_id: record.lease_id,
            access_key: issued.access_key,
            lease_duration,
            lease_max_duration,
            renewable: expires_at < max_expiry,
        })
    }

    /// Extends a lease using the group's current role.
    pub async fn renew(&self, lease_id: LeaseId) -> AppResult<LeaseRecord> {
        let mut record = self.lookup(lease_id).await?;
        let terms = self
            .credentials
            .renew(&record.internal_data, record.terms)
            .await?;

        let now = Utc::now();
        let max_expiry = record.issued_at + to_delta(self.limits.effective_max_ttl(&terms))?;
        if now >= max_expiry {
            return Err(AppError::Validation(format!(
                "lease '{lease_id}' has reached its max ttl"
            )));
        }

        record.terms = terms;
        record.expires_at = (now + to_delta(self.limits.effective_ttl(&terms))?).min(max_expiry);
        self.save(&record).await?;

        info!(
            lease_id = %lease_id,
            expires_at = %record.expires_at,
            "lease renewed"
        );
        Ok(record)
    }

    /// Revokes a lease now.
    ///
    /// The record is kept with the error when revocation fails so the
    /// sweeper can retry it.
    pub async fn revoke(&self, lease_id: LeaseId, cancel: &CancellationToken) -> AppResult<()> {
        let record = self.lookup(lease_id).await?;
        self.revoke_record(record, Utc::now(), cancel).await
    }

    /// Returns one lease record.
    pub async fn lookup(&self, lease_id: LeaseId) -> AppResult<LeaseRecord> {
        read_json(self.storage.as_ref(), lease_key(lease_id).as_str())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("lease '{lease_id}' does not exist")))
    }

    /// Lists every recorded lease.
    pub async fn list(&self) -> AppResult<Vec<LeaseId>> {
        self.storage
            .list(LEASE_PREFIX)
            .await?
            .iter()
            .map(|key| {
                key.parse::<LeaseId>().map_err(|error| {
                    AppError::Internal(format!("invalid lease key '{key}': {error}"))
                })
            })
            .collect()
    }

    async fn revoke_record(
        &self,
        mut record: LeaseRecord,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let mut revoked_through = record.revoked_through;
        let outcome = self
            .credentials
            .revoke_after(&record.internal_data, &mut revoked_through, cancel)
            .await;
        let progressed = revoked_through != record.revoked_through;
        record.revoked_through = revoked_through;

        match outcome {
            Ok(()) => {
                self.storage
                    .delete(lease_key(record.lease_id).as_str())
                    .await?;
                info!(lease_id = %record.lease_id, "lease revoked");
                Ok(())
            }
            Err(AppError::Cancelled(message)) => {
                if progressed && let Err(save_error) = self.save(&record).await {
                    error!(
                        lease_id = %record.lease_id,
                        error = %save_error,
                        "failed to record revocation progress"
                    );
                }
                Err(AppError::Cancelled(message))
            }
            Err(revoke_error) => {
                record.revoke_attempts = record.revoke_attempts.saturating_add(1);
                record.last_revoke_error = Some(revoke_error.to_string());
                record.next_revoke_at =
                    Some(now + to_delta(self.revoke_backoff(record.revoke_attempts))?);

                warn!(
                    lease_id = %record.lease_id,
                    attempts = record.revoke_attempts,
                    revoked_through = ?record.revoked_through,
                    error = %revoke_error,
                    "lease revocation failed; keeping record for retry"
                );

                if let Err(save_error) = self.save(&record).await {
                    error!(
                        lease_id = %record.lease_id,
                        error = %save_error,
                        "failed to record revocation failure"
                    );
                }
                Err(revoke_error)
            }
        }
    }

    fn revoke_backoff(&self, attempts: u32) -> Duration {
        self.revoke_retry_interval
            .saturating_mul(attempts)
            .min(MAX_REVOKE_BACKOFF)
    }

    async fn save(&self, record: &LeaseRecord) -> AppResult<()> {
        write_json(
            self.storage.as_ref(),
            lease_key(record.lease_id).as_str(),
            record,
        )
        .await
    }
}

fn lease_key(lease_id: LeaseId) -> String {
    format!("{LEASE_PREFIX}{lease_id}")
}

fn to_delta(duration: Duration) -> AppResult<TimeDelta> {
    TimeDelta::from_std(duration)
        .map_err(|error| AppError::Internal(format!("lease duration out of range: {error}")))
}
