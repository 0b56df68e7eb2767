use std::time::Duration;

use keyward_application::{IssuedLease, LeaseRecord, RoleWriteOutcome, UpstreamConfigView};
use keyward_domain::{RoleEntry, RoleEntryPatch};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for writing the broker's upstream credentials.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/write-config-request.ts"
)]
pub struct WriteConfigRequest {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// API representation of the upstream configuration; the secret key is never included.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/config-response.ts"
)]
pub struct ConfigResponse {
    pub access_key: String,
}

impl From<UpstreamConfigView> for ConfigResponse {
    fn from(value: UpstreamConfigView) -> Self {
        Self {
            access_key: value.access_key,
        }
    }
}

/// Incoming payload for role writes. Durations are in seconds.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/write-role-request.ts"
)]
pub struct WriteRoleRequest {
    pub ttl: Option<u64>,
    pub max_ttl: Option<u64>,
}

impl From<WriteRoleRequest> for RoleEntryPatch {
    fn from(value: WriteRoleRequest) -> Self {
        Self {
            ttl: value.ttl.map(Duration::from_secs),
            max_ttl: value.max_ttl.map(Duration::from_secs),
        }
    }
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub ttl: u64,
    pub max_ttl: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<RoleEntry> for RoleResponse {
    fn from(value: RoleEntry) -> Self {
        Self {
            ttl: value.ttl().as_secs(),
            max_ttl: value.max_ttl().as_secs(),
            warnings: Vec::new(),
        }
    }
}

impl From<RoleWriteOutcome> for RoleResponse {
    fn from(value: RoleWriteOutcome) -> Self {
        Self {
            warnings: value.warnings,
            ..Self::from(value.entry)
        }
    }
}

/// Key listing shared by roles and leases.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/key-list-response.ts"
)]
pub struct KeyListResponse {
    pub keys: Vec<String>,
}

/// Incoming payload for credential issuance.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/issue-credential-request.ts"
)]
pub struct IssueCredentialRequest {
    pub display_name: Option<String>,
}

/// Freshly issued credential. The secret key is returned only here.
#[derive(Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/issued-credential-response.ts"
)]
pub struct IssuedCredentialResponse {
    pub lease_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub lease_duration: u64,
    pub lease_max_duration: u64,
    pub renewable: bool,
}

impl From<IssuedLease> for IssuedCredentialResponse {
    fn from(value: IssuedLease) -> Self {
        Self {
            lease_id: value.lease_id.to_string(),
            access_key: value.access_key.id().to_owned(),
            secret_key: value.access_key.secret().to_owned(),
            lease_duration: value.lease_duration.as_secs(),
            lease_max_duration: value.lease_max_duration.as_secs(),
            renewable: value.renewable,
        }
    }
}

/// API representation of a recorded lease.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/lease-response.ts"
)]
pub struct LeaseResponse {
    pub lease_id: String,
    pub group_name: String,
    pub username: Option<String>,
    pub ttl: u64,
    pub max_ttl: u64,
    pub issued_at: String,
    pub expires_at: String,
    pub revoke_attempts: u32,
    pub last_revoke_error: Option<String>,
}

impl From<LeaseRecord> for LeaseResponse {
    fn from(value: LeaseRecord) -> Self {
        Self {
            lease_id: value.lease_id.to_string(),
            group_name: value.group_name.to_string(),
            username: value
                .internal_data
                .get(keyward_domain::USERNAME_KEY)
                .and_then(|username| username.as_str())
                .map(str::to_owned),
            ttl: value.terms.ttl.as_secs(),
            max_ttl: value.terms.max_ttl.as_secs(),
            issued_at: value.issued_at.to_rfc3339(),
            expires_at: value.expires_at.to_rfc3339(),
            revoke_attempts: value.revoke_attempts,
            last_revoke_error: value.last_revoke_error,
        }
    }
}
