use std::time::Duration;

use keyward_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Longest group name the identity platform accepts.
pub const MAX_GROUP_NAME_LENGTH: usize = 64;

/// Validated name of a pre-existing permission group on the identity platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupName(String);

impl GroupName {
    /// Creates a validated group name.
    ///
    /// Names are word characters with `-` and `.` allowed in the middle, as
    /// used in request paths.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(AppError::Validation(
                "group name must not be empty".to_owned(),
            ));
        }

        if value.len() > MAX_GROUP_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "group name must not exceed {MAX_GROUP_NAME_LENGTH} characters"
            )));
        }

        let is_word = |character: char| character.is_ascii_alphanumeric() || character == '_';
        if !value
            .chars()
            .all(|character| is_word(character) || character == '-' || character == '.')
        {
            return Err(AppError::Validation(format!(
                "group name '{value}' may only contain letters, digits, '_', '-' and '.'"
            )));
        }

        let starts_with_word = value.chars().next().is_some_and(is_word);
        let ends_with_word = value.chars().last().is_some_and(is_word);
        if !starts_with_word || !ends_with_word {
            return Err(AppError::Validation(format!(
                "group name '{value}' must start and end with a letter, digit or '_'"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for GroupName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GroupName> for String {
    fn from(value: GroupName) -> Self {
        value.0
    }
}

impl std::fmt::Display for GroupName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// TTL policy for credentials issued against one group.
///
/// A zero duration means "inherit the system default", never "zero lifetime".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    #[serde(with = "duration_seconds")]
    ttl: Duration,
    #[serde(with = "duration_seconds")]
    max_ttl: Duration,
}

impl RoleEntry {
    /// Creates a validated role entry.
    pub fn new(ttl: Duration, max_ttl: Duration) -> AppResult<Self> {
        let entry = Self { ttl, max_ttl };
        entry.validate()?;
        Ok(entry)
    }

    /// Returns the default lease TTL override.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the maximum lease TTL override.
    #[must_use]
    pub fn max_ttl(&self) -> Duration {
        self.max_ttl
    }

    /// Merges the provided fields over this entry and validates the result.
    ///
    /// Fields absent from the patch keep their current values.
    pub fn merged(self, patch: RoleEntryPatch) -> AppResult<Self> {
        let merged = Self {
            ttl: patch.ttl.unwrap_or(self.ttl),
            max_ttl: patch.max_ttl.unwrap_or(self.max_ttl),
        };
        merged.validate()?;
        Ok(merged)
    }

    fn validate(&self) -> AppResult<()> {
        if !self.max_ttl.is_zero() && self.ttl > self.max_ttl {
            return Err(AppError::Validation("ttl exceeds max_ttl".to_owned()));
        }

        Ok(())
    }
}

/// Fields supplied by a role write; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleEntryPatch {
    /// Replacement TTL.
    pub ttl: Option<Duration>,
    /// Replacement maximum TTL.
    pub max_ttl: Option<Duration>,
}

mod duration_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{GroupName, RoleEntry, RoleEntryPatch};

    #[test]
    fn ttl_above_max_ttl_is_rejected() {
        let result = RoleEntry::new(Duration::from_secs(100), Duration::from_secs(50));
        assert!(result.is_err());
    }

    #[test]
    fn zero_max_ttl_allows_any_ttl() {
        let result = RoleEntry::new(Duration::from_secs(100_000), Duration::ZERO);
        assert!(result.is_ok());
    }

    #[test]
    fn partial_patch_keeps_unset_fields() {
        let existing = RoleEntry::new(Duration::from_secs(100), Duration::from_secs(200));
        assert!(existing.is_ok());

        let merged = existing
            .unwrap_or_default()
            .merged(RoleEntryPatch {
                ttl: Some(Duration::from_secs(150)),
                max_ttl: None,
            });
        assert!(merged.is_ok());
        let merged = merged.unwrap_or_default();
        assert_eq!(merged.ttl(), Duration::from_secs(150));
        assert_eq!(merged.max_ttl(), Duration::from_secs(200));
    }

    #[test]
    fn patch_is_validated_after_merge() {
        let existing = RoleEntry::new(Duration::from_secs(100), Duration::from_secs(200));
        assert!(existing.is_ok());

        let merged = existing.unwrap_or_default().merged(RoleEntryPatch {
            ttl: Some(Duration::from_secs(300)),
            max_ttl: None,
        });
        assert!(merged.is_err());
    }

    #[test]
    fn role_entry_serializes_as_seconds() {
        let entry = RoleEntry::new(Duration::from_secs(60), Duration::from_secs(120));
        assert!(entry.is_ok());

        let json = serde_json::to_value(entry.unwrap_or_default());
        assert!(json.is_ok());
        assert_eq!(
            json.unwrap_or_default(),
            serde_json::json!({"ttl": 60, "max_ttl": 120})
        );
    }

    #[test]
    fn group_name_accepts_platform_names() {
        assert!(GroupName::new("deploy").is_ok());
        assert!(GroupName::new("team.ops-readonly_2").is_ok());
    }

    #[test]
    fn group_name_rejects_path_characters() {
        assert!(GroupName::new("").is_err());
        assert!(GroupName::new("ops/admin").is_err());
        assert!(GroupName::new("-ops").is_err());
        assert!(GroupName::new("ops.").is_err());
        assert!(GroupName::new("g".repeat(65)).is_err());
    }
}
