use super::*;

/// Outcome of one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Leases revoked and removed.
    pub revoked: usize,
    /// Leases whose revocation failed and were kept for retry.
    pub failed: usize,
    /// Entries under the lease prefix that could not be read or decoded.
    pub unreadable: usize,
}

impl LeaseService {
    /// Revokes every lease whose expiry is at or before `now`.
    ///
    /// Leases in revocation backoff are skipped until their retry time.
    /// Cancellation stops the sweep between leases.
    pub async fn revoke_expired(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        for key in self.storage.list(LEASE_PREFIX).await? {
            if cancel.is_cancelled() {
                break;
            }

            let Ok(lease_id) = key.parse::<LeaseId>() else {
                warn!(key = %key, "skipping lease entry with invalid id");
                report.unreadable += 1;
                continue;
            };

            let record = match read_json::<LeaseRecord>(
                self.storage.as_ref(),
                lease_key(lease_id).as_str(),
            )
            .await
            {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(read_error) => {
                    warn!(
                        lease_id = %lease_id,
                        error = %read_error,
                        "skipping unreadable lease record"
                    );
                    report.unreadable += 1;
                    continue;
                }
            };

            let in_backoff = record.next_revoke_at.is_some_and(|retry_at| retry_at > now);
            if record.expires_at > now || in_backoff {
                continue;
            }

            match self.revoke_record(record, now, cancel).await {
                Ok(()) => report.revoked += 1,
                Err(AppError::Cancelled(_)) => break,
                Err(_) => report.failed += 1,
            }
        }

        if report.revoked > 0 || report.failed > 0 || report.unreadable > 0 {
            info!(
                revoked = report.revoked,
                failed = report.failed,
                unreadable = report.unreadable,
                "expired lease sweep finished"
            );
        }

        Ok(report)
    }
}
