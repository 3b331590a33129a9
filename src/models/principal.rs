use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace a principal authenticates in. Usernames and emails are unique
/// per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Admin,
    User,
}

impl PrincipalKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => anyhow::bail!("Unknown principal kind: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Enabled,
    Disabled,
    Archived,
    Deleted,
    Pending,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
            Self::Pending => "pending",
        }
    }

    #[must_use]
    pub const fn can_authenticate(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            "pending" => Ok(Self::Pending),
            other => anyhow::bail!("Unknown account status: {other}"),
        }
    }
}

/// An administrator or user account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i32,
    pub kind: PrincipalKind,
    pub username: String,
    pub email: String,
    pub status: AccountStatus,
    /// Unix seconds.
    pub password_changed_at: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Usernames and emails are stored trimmed and lowercased.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_identifier("bob"), "bob");
    }

    #[test]
    fn test_status_round_trip_and_gate() {
        for status in [
            AccountStatus::Enabled,
            AccountStatus::Disabled,
            AccountStatus::Archived,
            AccountStatus::Deleted,
            AccountStatus::Pending,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!(AccountStatus::Enabled.can_authenticate());
        assert!(!AccountStatus::Pending.can_authenticate());
        assert!("bogus".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Administrator".parse::<PrincipalKind>().unwrap(), PrincipalKind::Admin);
        assert_eq!("user".parse::<PrincipalKind>().unwrap(), PrincipalKind::User);
        assert!("robot".parse::<PrincipalKind>().is_err());
    }
}
