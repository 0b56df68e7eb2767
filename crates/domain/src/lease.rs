use std::time::Duration;

use keyward_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::RoleEntry;

/// TTL settings carried by a lease.
///
/// Zero values defer to [`SystemLeaseLimits`] when the lease is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerms {
    /// Requested lease duration.
    pub ttl: Duration,
    /// Requested upper bound on the total lease lifetime.
    pub max_ttl: Duration,
}

impl LeaseTerms {
    /// Overrides these terms with the role's non-zero values.
    #[must_use]
    pub fn with_role(self, role: &RoleEntry) -> Self {
        Self {
            ttl: if role.ttl().is_zero() {
                self.ttl
            } else {
                role.ttl()
            },
            max_ttl: if role.max_ttl().is_zero() {
                self.max_ttl
            } else {
                role.max_ttl()
            },
        }
    }
}

/// System-wide lease defaults applied when a role leaves TTLs at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemLeaseLimits {
    default_lease_ttl: Duration,
    max_lease_ttl: Duration,
}

impl SystemLeaseLimits {
    /// Creates validated system lease limits.
    pub fn new(default_lease_ttl: Duration, max_lease_ttl: Duration) -> AppResult<Self> {
        if max_lease_ttl.is_zero() {
            return Err(AppError::Validation(
                "max lease ttl must be greater than zero".to_owned(),
            ));
        }

        if default_lease_ttl.is_zero() || default_lease_ttl > max_lease_ttl {
            return Err(AppError::Validation(
                "default lease ttl must be between one second and the max lease ttl".to_owned(),
            ));
        }

        Ok(Self {
            default_lease_ttl,
            max_lease_ttl,
        })
    }

    /// Returns the default lease duration.
    #[must_use]
    pub fn default_lease_ttl(&self) -> Duration {
        self.default_lease_ttl
    }

    /// Returns the longest lease lifetime the system allows.
    #[must_use]
    pub fn max_lease_ttl(&self) -> Duration {
        self.max_lease_ttl
    }

    /// Resolves the total lifetime cap for a lease.
    #[must_use]
    pub fn effective_max_ttl(&self, terms: &LeaseTerms) -> Duration {
        if terms.max_ttl.is_zero() {
            self.max_lease_ttl
        } else {
            terms.max_ttl.min(self.max_lease_ttl)
        }
    }

    /// Resolves the lease duration granted for one issue or renew.
    #[must_use]
    pub fn effective_ttl(&self, terms: &LeaseTerms) -> Duration {
        let requested = if terms.ttl.is_zero() {
            self.default_lease_ttl
        } else {
            terms.ttl
        };

        requested.min(self.effective_max_ttl(terms))
    }
}
