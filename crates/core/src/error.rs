use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The broker has no upstream credentials to call the identity platform with.
    #[error("upstream credentials are not configured")]
    UpstreamNotConfigured,

    /// The role policy for a group could not be loaded.
    #[error("failed to load role policy: {0}")]
    RolePolicyLoadFailed(String),

    /// A single identity platform call failed.
    #[error("remote identity platform error: {0}")]
    Remote(String),

    /// Credential issuance failed part-way through provisioning.
    #[error("credential provisioning failed: {0}")]
    Provisioning(ProvisioningFailure),

    /// Credential revocation stopped at one step.
    #[error("credential revocation failed: {0}")]
    Revocation(RevocationFailure),

    /// Lease internal data is missing a required field.
    #[error("malformed lease metadata: {0}")]
    MalformedLeaseMetadata(String),

    /// Caller cancelled the operation before any remote call was made.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Forward steps of credential provisioning, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningStep {
    /// Creating the ephemeral identity.
    CreateIdentity,
    /// Adding the identity to its permission group.
    AttachToGroup,
    /// Minting the access key pair.
    CreateAccessKey,
}

impl ProvisioningStep {
    /// Returns a stable name for logs and error payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIdentity => "create_identity",
            Self::AttachToGroup => "attach_to_group",
            Self::CreateAccessKey => "create_access_key",
        }
    }

    /// Returns the failure code reported when this step fails.
    #[must_use]
    pub fn failure_code(&self) -> &'static str {
        match self {
            Self::CreateIdentity => "remote_identity_create_failed",
            Self::AttachToGroup => "group_attach_failed",
            Self::CreateAccessKey => "access_key_create_failed",
        }
    }
}

impl Display for ProvisioningStep {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A compensating action that itself failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Forward step whose effect could not be undone.
    pub step: ProvisioningStep,
    /// Platform error returned by the compensating call.
    pub message: String,
}

/// Outcome of a provisioning run that did not complete.
///
/// The remote platform may still hold the identity when `cleanup_failures`
/// or `skipped_compensations` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningFailure {
    /// Forward step that failed, or that was about to start on cancellation.
    pub step: ProvisioningStep,
    /// Original error.
    pub message: String,
    /// True when the run stopped because the caller cancelled it.
    pub cancelled: bool,
    /// Compensations that were attempted and failed.
    pub cleanup_failures: Vec<CleanupFailure>,
    /// Compensations never started because of cancellation.
    pub skipped_compensations: Vec<ProvisioningStep>,
}

impl ProvisioningFailure {
    /// Returns whether every completed step was successfully undone.
    #[must_use]
    pub fn fully_compensated(&self) -> bool {
        self.cleanup_failures.is_empty() && self.skipped_compensations.is_empty()
    }
}

impl Display for ProvisioningFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} at {}: {}",
            self.step.failure_code(),
            self.step,
            self.message
        )?;

        for failure in &self.cleanup_failures {
            write!(
                formatter,
                "; cleanup of {} failed: {}",
                failure.step, failure.message
            )?;
        }

        if !self.skipped_compensations.is_empty() {
            let skipped = self
                .skipped_compensations
                .iter()
                .map(ProvisioningStep::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            write!(formatter, "; cleanup skipped for {skipped}")?;
        }

        Ok(())
    }
}

/// Teardown steps of credential revocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationStep {
    /// Deleting the issued access key.
    DeleteAccessKey,
    /// Removing the identity from its group.
    RemoveFromGroup,
    /// Deleting the identity itself.
    DeleteIdentity,
}

impl RevocationStep {
    /// Every step in execution order.
    pub const ORDER: [Self; 3] = [
        Self::DeleteAccessKey,
        Self::RemoveFromGroup,
        Self::DeleteIdentity,
    ];

    /// Returns the steps still to run once `completed` has succeeded.
    #[must_use]
    pub fn remaining_after(completed: Option<Self>) -> &'static [Self] {
        match completed {
            None => &Self::ORDER,
            Some(Self::DeleteAccessKey) => &Self::ORDER[1..],
            Some(Self::RemoveFromGroup) => &Self::ORDER[2..],
            Some(Self::DeleteIdentity) => &[],
        }
    }

    /// Returns a stable name for logs and error payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteAccessKey => "delete_access_key",
            Self::RemoveFromGroup => "remove_from_group",
            Self::DeleteIdentity => "delete_identity",
        }
    }
}

impl Display for RevocationStep {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Revocation stopped at `step`; later steps were not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationFailure {
    /// Step that failed.
    pub step: RevocationStep,
    /// Platform error returned by the step.
    pub message: String,
}

impl Display for RevocationFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} failed: {}", self.step, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, CleanupFailure, ProvisioningFailure, ProvisioningStep, RevocationStep};

    #[test]
    fn revocation_resumes_after_completed_step() {
        assert_eq!(
            RevocationStep::remaining_after(None),
            RevocationStep::ORDER.as_slice()
        );
        assert_eq!(
            RevocationStep::remaining_after(Some(RevocationStep::DeleteAccessKey)),
            [RevocationStep::RemoveFromGroup, RevocationStep::DeleteIdentity].as_slice()
        );
        assert!(RevocationStep::remaining_after(Some(RevocationStep::DeleteIdentity)).is_empty());
    }

    #[test]
    fn provisioning_failure_reports_cleanup_outcome() {
        let failure = ProvisioningFailure {
            step: ProvisioningStep::CreateAccessKey,
            message: "quota exceeded".to_owned(),
            cancelled: false,
            cleanup_failures: vec![CleanupFailure {
                step: ProvisioningStep::CreateIdentity,
                message: "DeleteConflict.User.Group".to_owned(),
            }],
            skipped_compensations: Vec::new(),
        };

        assert!(!failure.fully_compensated());
        let rendered = AppError::Provisioning(failure).to_string();
        assert!(rendered.contains("access_key_create_failed"));
        assert!(rendered.contains("cleanup of create_identity failed"));
    }

    #[test]
    fn provisioning_failure_without_cleanup_is_fully_compensated() {
        let failure = ProvisioningFailure {
            step: ProvisioningStep::AttachToGroup,
            message: "EntityNotExist.Group".to_owned(),
            cancelled: false,
            cleanup_failures: Vec::new(),
            skipped_compensations: Vec::new(),
        };

        assert!(failure.fully_compensated());
        assert_eq!(
            failure.to_string(),
            "group_attach_failed at attach_to_group: EntityNotExist.Group"
        );
    }
}
