use super::*;

impl CredentialService {
    /// Tears down the identity recorded in lease internal data.
    ///
    /// Steps run in reverse of issuance and stop at the first failure.
    pub async fn revoke(
        &self,
        internal_data: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        self.revoke_after(internal_data, &mut None, cancel).await
    }

    /// Continues a teardown from the step after `revoked_through`.
    ///
    /// `revoked_through` advances as each step succeeds, so after a failure
    /// or cancellation it names the last step that need not run again.
    pub async fn revoke_after(
        &self,
        internal_data: &Map<String, Value>,
        revoked_through: &mut Option<RevocationStep>,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let metadata = LeaseMetadata::from_internal_data(internal_data)?;
        let platform = self.platform().await?;
        let username = metadata.username();

        for &step in RevocationStep::remaining_after(*revoked_through) {
            if cancel.is_cancelled() {
                warn!(username = %username, step = %step, "revocation cancelled");
                return Err(AppError::Cancelled(format!(
                    "revocation cancelled before {step}"
                )));
            }

            let result = match step {
                RevocationStep::DeleteAccessKey => {
                    platform
                        .delete_access_key(username, metadata.access_key_id())
                        .await
                }
                RevocationStep::RemoveFromGroup => {
                    platform
                        .remove_from_group(username, metadata.group_name())
                        .await
                }
                RevocationStep::DeleteIdentity => platform.delete_identity(username).await,
            };

            if let Err(step_error) = result {
                let message = remote_message(step_error);
                error!(
                    username = %username,
                    group = %metadata.group_name(),
                    step = %step,
                    error = %message,
                    "revocation step failed"
                );
                return Err(AppError::Revocation(RevocationFailure { step, message }));
            }

            *revoked_through = Some(step);
        }

        info!(username = %username, group = %metadata.group_name(), "credential revoked");
        Ok(())
    }
}
