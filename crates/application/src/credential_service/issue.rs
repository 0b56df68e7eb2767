use super::saga::{
    self, AttachToGroup, CreateAccessKey, CreateIdentity, ProvisioningContext, SagaAbort,
};
use super::*;

impl CredentialService {
    /// Provisions a new identity in `group_name` and mints its access key.
    ///
    /// Partial provisioning is compensated before the error is returned; no
    /// partial credential is ever handed out.
    pub async fn issue(
        &self,
        display_name: &str,
        group_name: &GroupName,
        cancel: &CancellationToken,
    ) -> AppResult<IssuedCredential> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled(
                "credential issuance cancelled before start".to_owned(),
            ));
        }

        let platform = self.platform().await?;
        let role = self.load_role(group_name).await?.unwrap_or_default();
        let username = generate_username(display_name, group_name.as_str());

        info!(username = %username, group = %group_name, "issuing credential");

        let mut context = ProvisioningContext {
            platform,
            username,
            group_name: group_name.clone(),
            access_key: None,
        };

        match saga::run(
            &[&CreateIdentity, &AttachToGroup, &CreateAccessKey],
            &mut context,
            cancel,
        )
        .await
        {
            Ok(()) => {}
            Err(SagaAbort::NotStarted) => {
                return Err(AppError::Cancelled(
                    "credential issuance cancelled before start".to_owned(),
                ));
            }
            Err(SagaAbort::Failed(failure)) => return Err(AppError::Provisioning(failure)),
        }

        let Some(access_key) = context.access_key else {
            return Err(AppError::Internal(
                "provisioning finished without an access key".to_owned(),
            ));
        };

        let metadata = LeaseMetadata::new(context.username, context.group_name, access_key.id());
        info!(
            username = %metadata.username(),
            group = %metadata.group_name(),
            access_key_id = %metadata.access_key_id(),
            "credential issued"
        );

        Ok(IssuedCredential {
            access_key,
            metadata,
            terms: LeaseTerms::default().with_role(&role),
        })
    }
}
