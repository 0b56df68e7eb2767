//! Application services and ports for the credential broker.

#![forbid(unsafe_code)]

mod config_service;
mod credential_service;
mod identity_ports;
mod lease_service;
mod role_service;
mod storage_ports;
mod sweep_ports;

#[cfg(test)]
mod test_support;

pub use config_service::{ConfigService, UpstreamConfigView};
pub use credential_service::CredentialService;
pub use identity_ports::{IdentityPlatform, IdentityPlatformConnector};
pub use lease_service::{
    DEFAULT_REVOKE_RETRY_INTERVAL, IssuedLease, LeaseRecord, LeaseService, MAX_REVOKE_BACKOFF,
    SweepReport,
};
pub use role_service::{RoleService, RoleWriteOutcome};
pub use storage_ports::{
    CONFIG_KEY, LEASE_PREFIX, ROLE_PREFIX, SecretStorage, read_json, write_json,
};
pub use sweep_ports::{SweepLock, SweepLockCoordinator};
