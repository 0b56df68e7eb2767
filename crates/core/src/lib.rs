//! Shared primitives for all Rust crates in Keyward.

#![forbid(unsafe_code)]

/// Failure reports for the credential lifecycle.
pub mod error;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::{
    AppError, CleanupFailure, ProvisioningFailure, ProvisioningStep, RevocationFailure,
    RevocationStep,
};

/// Result type used across Keyward crates.
pub type AppResult<T> = Result<T, AppError>;

/// Identifier of one issued credential lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaseId(Uuid);

impl LeaseId {
    /// Creates a random lease identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a lease identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LeaseId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for LeaseId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid lease id '{value}': {error}")))
    }
}
