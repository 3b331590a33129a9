use serde::{Deserialize, Serialize};
use std::time::Duration;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Lockout and password rules embedded in a role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub login_lockout_policy: bool,

    /// Failures inside the window that trigger a lock. 0 never locks.
    pub login_max_attempts: u32,

    /// Sliding window, in seconds.
    pub login_timeframe: u64,

    /// Lock duration, in seconds, measured from the triggering failure.
    pub login_ban_time: u64,

    /// Count failures per source IP instead of per principal.
    pub login_ban_by_ip: bool,

    /// Enforce the reuse-history check.
    pub password_policy: bool,

    pub password_reuse_history: u32,

    /// Maximum password age in days. 0 disables expiry.
    pub password_reset_days: u32,
}

impl Policy {
    #[must_use]
    pub const fn lockout_enabled(&self) -> bool {
        self.login_lockout_policy && self.login_max_attempts > 0
    }

    #[must_use]
    pub const fn timeframe(&self) -> Duration {
        Duration::from_secs(self.login_timeframe)
    }

    #[must_use]
    pub const fn ban_time(&self) -> Duration {
        Duration::from_secs(self.login_ban_time)
    }

    #[must_use]
    pub const fn reuse_check_enabled(&self) -> bool {
        self.password_policy && self.password_reuse_history > 0
    }

    /// Whether a password set at `changed_at` has outlived `password_reset_days`.
    #[must_use]
    pub fn password_expired(&self, changed_at: i64, now: i64) -> bool {
        if self.password_reset_days == 0 {
            return false;
        }
        now - changed_at > i64::from(self.password_reset_days) * SECS_PER_DAY
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub policy: Policy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_permissive() {
        let policy = Policy::default();
        assert!(!policy.lockout_enabled());
        assert!(!policy.reuse_check_enabled());
        assert!(!policy.password_expired(0, i64::MAX / 2));
    }

    #[test]
    fn test_zero_attempts_never_locks() {
        let policy = Policy {
            login_lockout_policy: true,
            login_max_attempts: 0,
            ..Policy::default()
        };
        assert!(!policy.lockout_enabled());
    }

    #[test]
    fn test_password_expiry() {
        let policy = Policy {
            password_reset_days: 90,
            ..Policy::default()
        };
        let changed = 1_000_000;
        assert!(!policy.password_expired(changed, changed + 90 * SECS_PER_DAY));
        assert!(policy.password_expired(changed, changed + 90 * SECS_PER_DAY + 1));
    }
}
