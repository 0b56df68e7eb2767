use keyward_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{GroupName, LeaseTerms};

/// Internal-data key holding the generated username.
pub const USERNAME_KEY: &str = "username";
/// Internal-data key holding the group the identity was attached to.
pub const GROUP_NAME_KEY: &str = "group_name";
/// Internal-data key holding the minted access key id.
pub const ACCESS_KEY_ID_KEY: &str = "access_key_id";

/// The broker's own credentials for calling the identity platform.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamCredential {
    access_key: String,
    secret_key: String,
}

impl UpstreamCredential {
    /// Creates upstream credentials, requiring both halves.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> AppResult<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if access_key.trim().is_empty() {
            return Err(AppError::Validation("access_key is required".to_owned()));
        }

        if secret_key.trim().is_empty() {
            return Err(AppError::Validation("secret_key is required".to_owned()));
        }

        Ok(Self {
            access_key,
            secret_key,
        })
    }

    /// Returns the access key id.
    #[must_use]
    pub fn access_key(&self) -> &str {
        self.access_key.as_str()
    }

    /// Returns the secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        self.secret_key.as_str()
    }
}

impl std::fmt::Debug for UpstreamCredential {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("UpstreamCredential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Access key pair minted for an ephemeral identity.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey {
    id: String,
    secret: String,
}

impl AccessKey {
    /// Creates an access key pair as returned by the platform.
    #[must_use]
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// Returns the access key id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the access key secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AccessKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// What the broker remembers about an issued credential.
///
/// Recorded at issuance and replayed on renew and revoke; never re-derived
/// from the credential's visible fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseMetadata {
    username: String,
    group_name: GroupName,
    access_key_id: String,
}

impl LeaseMetadata {
    /// Creates lease metadata for a provisioned identity.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        group_name: GroupName,
        access_key_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            group_name,
            access_key_id: access_key_id.into(),
        }
    }

    /// Returns the remote identity name.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns the group the identity belongs to.
    #[must_use]
    pub fn group_name(&self) -> &GroupName {
        &self.group_name
    }

    /// Returns the access key id handed to the caller.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        self.access_key_id.as_str()
    }

    /// Serializes into the opaque internal data attached to a lease.
    #[must_use]
    pub fn to_internal_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(USERNAME_KEY.to_owned(), Value::from(self.username.as_str()));
        data.insert(
            GROUP_NAME_KEY.to_owned(),
            Value::from(self.group_name.as_str()),
        );
        data.insert(
            ACCESS_KEY_ID_KEY.to_owned(),
            Value::from(self.access_key_id.as_str()),
        );
        data
    }

    /// Parses lease internal data, rejecting records with any field missing.
    pub fn from_internal_data(data: &Map<String, Value>) -> AppResult<Self> {
        let username = required_field(data, USERNAME_KEY)?;
        let group_name = GroupName::new(required_field(data, GROUP_NAME_KEY)?).map_err(|error| {
            AppError::MalformedLeaseMetadata(format!("lease has invalid {GROUP_NAME_KEY}: {error}"))
        })?;
        let access_key_id = required_field(data, ACCESS_KEY_ID_KEY)?;

        Ok(Self {
            username,
            group_name,
            access_key_id,
        })
    }
}

/// A freshly provisioned credential, returned exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// Secret material handed to the requester.
    pub access_key: AccessKey,
    /// Metadata needed later to renew or revoke.
    pub metadata: LeaseMetadata,
    /// Lease overrides taken from the group's role.
    pub terms: LeaseTerms,
}

fn required_field(data: &Map<String, Value>, key: &str) -> AppResult<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            AppError::MalformedLeaseMetadata(format!("lease is missing {key} internal data"))
        })
}
