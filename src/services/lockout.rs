//! Brute-force lockout tracking.
//!
//! Failures are counted per subject inside a sliding `login_timeframe` window.
//! When the count reaches `login_max_attempts` the subject is locked until
//! `login_ban_time` seconds after the failure that reached the threshold.
//! Failures recorded while locked are counted but never move that deadline,
//! and once it passes the subject starts over with an empty window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::db::Store;
use crate::models::{Policy, PrincipalKind};

/// What failures are counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Principal { kind: PrincipalKind, id: i32 },
    Ip(IpAddr),
}

impl SubjectKey {
    /// Per-IP when the policy asks for it and the source address is known,
    /// per-principal otherwise.
    #[must_use]
    pub fn for_policy(policy: &Policy, kind: PrincipalKind, id: i32, ip: Option<IpAddr>) -> Self {
        match ip {
            Some(ip) if policy.login_ban_by_ip => Self::Ip(ip),
            _ => Self::Principal { kind, id },
        }
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal { kind, id } => write!(f, "principal:{kind}:{id}"),
            Self::Ip(ip) => write!(f, "ip:{ip}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub locked: bool,
    /// Failures currently inside the window.
    pub failures: u32,
    /// Time left on an active lock.
    pub remaining: Option<Duration>,
}

impl LockState {
    #[must_use]
    pub const fn unlocked(failures: u32) -> Self {
        Self {
            locked: false,
            failures,
            remaining: None,
        }
    }

    /// A lock is in effect while `now <= locked_until`.
    #[must_use]
    pub fn evaluate(failures: u32, locked_until: Option<i64>, now: i64) -> Self {
        match locked_until {
            Some(until) if now <= until => Self {
                locked: true,
                failures,
                remaining: Some(Duration::from_secs(u64::try_from(until - now).unwrap_or(0))),
            },
            _ => Self::unlocked(failures),
        }
    }
}

pub(crate) fn saturating_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Oldest timestamp still inside the failure window ending at `now`.
#[must_use]
pub fn window_start(policy: &Policy, now: i64) -> i64 {
    now.saturating_sub(saturating_secs(policy.login_timeframe))
}

/// Deadline of a lock triggered at `now`.
#[must_use]
pub fn lock_deadline(policy: &Policy, now: i64) -> i64 {
    now.saturating_add(saturating_secs(policy.login_ban_time))
}

/// Per-subject failure bookkeeping.
///
/// Implementations must make `record_failure` linearizable per subject: two
/// concurrent failures are both counted and at most one of them triggers the
/// lock.
#[async_trait]
pub trait LockoutTracker: Send + Sync {
    /// Count a failure at `now`, locking the subject if it reaches the
    /// threshold. Returns the state after the failure.
    async fn record_failure(
        &self,
        subject: &SubjectKey,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<LockState>;

    /// Current state. Always unlocked when the policy disables lockout.
    async fn lock_state(
        &self,
        subject: &SubjectKey,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<LockState>;

    /// Forget every failure and any lock for the subject.
    async fn reset(&self, subject: &SubjectKey) -> anyhow::Result<()>;

    /// Drop failures older than `retention` and expired locks. Returns the
    /// number of records removed.
    async fn prune(&self, now: DateTime<Utc>, retention: Duration) -> anyhow::Result<u64>;
}

/// Retention applied when pruning: the configured value, raised to the longest
/// `login_timeframe` of any role.
pub async fn covering_retention(store: &Store, configured: Duration) -> anyhow::Result<Duration> {
    let longest = Duration::from_secs(store.longest_login_timeframe().await?);
    if longest > configured {
        warn!(
            configured_secs = configured.as_secs(),
            longest_timeframe_secs = longest.as_secs(),
            "Lockout retention is shorter than a role's login_timeframe; keeping failures for the timeframe instead"
        );
        return Ok(longest);
    }
    Ok(configured)
}

/// Periodically prune the tracker until the runtime shuts down. Role
/// timeframes are re-read on every run.
pub fn spawn_pruner(
    tracker: Arc<dyn LockoutTracker>,
    store: Store,
    clock: Arc<dyn Clock>,
    interval: Duration,
    retention: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let retention = match covering_retention(&store, retention).await {
                Ok(retention) => retention,
                Err(e) => {
                    error!(error = %e, "Failed to read role timeframes, skipping prune");
                    continue;
                }
            };
            match tracker.prune(clock.now(), retention).await {
                Ok(removed) if removed > 0 => debug!(removed, "Pruned lockout records"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Failed to prune lockout records"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy {
            login_lockout_policy: true,
            login_max_attempts: 3,
            login_timeframe: 600,
            login_ban_time: 1800,
            ..Policy::default()
        }
    }

    #[test]
    fn test_subject_key_selection() {
        let ip: IpAddr = "10.0.0.7".parse().unwrap();
        let mut policy = policy();

        let key = SubjectKey::for_policy(&policy, PrincipalKind::User, 4, Some(ip));
        assert_eq!(key.to_string(), "principal:user:4");

        policy.login_ban_by_ip = true;
        let key = SubjectKey::for_policy(&policy, PrincipalKind::User, 4, Some(ip));
        assert_eq!(key.to_string(), "ip:10.0.0.7");

        // no address known: fall back to the principal
        let key = SubjectKey::for_policy(&policy, PrincipalKind::Admin, 4, None);
        assert_eq!(key.to_string(), "principal:admin:4");
    }

    #[test]
    fn test_evaluate_boundaries() {
        let state = LockState::evaluate(3, Some(2800), 1000);
        assert!(state.locked);
        assert_eq!(state.remaining, Some(Duration::from_secs(1800)));

        assert!(LockState::evaluate(3, Some(2800), 2800).locked);
        assert!(!LockState::evaluate(3, Some(2800), 2801).locked);
        assert!(!LockState::evaluate(2, None, 2801).locked);
    }

    #[test]
    fn test_window_and_deadline() {
        let policy = policy();
        assert_eq!(window_start(&policy, 10_000), 9_400);
        assert_eq!(lock_deadline(&policy, 10_000), 11_800);

        let huge = Policy {
            login_timeframe: u64::MAX,
            login_ban_time: u64::MAX,
            ..policy
        };
        assert_eq!(window_start(&huge, 5), 5 - i64::MAX);
        assert_eq!(lock_deadline(&huge, 5), i64::MAX);
    }
}
