//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod credential;
mod lease;
mod role;
mod username;

pub use credential::{
    ACCESS_KEY_ID_KEY, AccessKey, GROUP_NAME_KEY, IssuedCredential, LeaseMetadata, USERNAME_KEY,
    UpstreamCredential,
};
pub use lease::{LeaseTerms, SystemLeaseLimits};
pub use role::{GroupName, MAX_GROUP_NAME_LENGTH, RoleEntry, RoleEntryPatch};
pub use username::{
    MAX_USERNAME_LENGTH, RESERVED_SUFFIX_LENGTH, generate_username, readable_prefix,
};
