use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Enabled,
    Disabled,
    Pending,
    Archived,
    Deleted,
}

impl KeyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Pending => "pending",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// Keys in the enabled/disabled/pending listing tri-state pass the gate;
    /// archived and deleted keys do not.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Enabled | Self::Disabled | Self::Pending)
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "pending" => Ok(Self::Pending),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            other => anyhow::bail!("Unknown application key status: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppKey {
    pub id: i32,
    pub key: String,
    pub application: String,
    pub status: KeyStatus,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_statuses() {
        assert!(KeyStatus::Enabled.is_accepted());
        assert!(KeyStatus::Disabled.is_accepted());
        assert!(KeyStatus::Pending.is_accepted());
        assert!(!KeyStatus::Archived.is_accepted());
        assert!(!KeyStatus::Deleted.is_accepted());
    }
}
