use super::*;

impl CredentialService {
    /// Re-applies the group's current role to an issued lease.
    ///
    /// Never contacts the identity platform. A deleted role leaves `current`
    /// unchanged.
    pub async fn renew(
        &self,
        internal_data: &Map<String, Value>,
        current: LeaseTerms,
    ) -> AppResult<LeaseTerms> {
        let metadata = LeaseMetadata::from_internal_data(internal_data)?;

        Ok(match self.load_role(metadata.group_name()).await? {
            Some(role) => current.with_role(&role),
            None => current,
        })
    }
}
