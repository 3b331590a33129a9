//! In-process lockout tracker for single-instance deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::warn;

use super::lockout::{LockState, LockoutTracker, SubjectKey, lock_deadline, window_start};
use crate::models::Policy;

#[derive(Debug, Default)]
struct Window {
    attempts: Vec<i64>,
    locked_until: Option<i64>,
}

impl Window {
    /// Lift an elapsed lock (starting a fresh window) and drop failures that
    /// fell out of the timeframe.
    fn expire(&mut self, policy: &Policy, now: i64) {
        if self.locked_until.is_some_and(|until| now > until) {
            self.attempts.clear();
            self.locked_until = None;
        }

        let start = window_start(policy, now);
        self.attempts.retain(|&ts| ts >= start);
    }

    fn failures(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX)
    }

    fn state(&self, policy: &Policy, now: i64) -> LockState {
        if policy.lockout_enabled() {
            LockState::evaluate(self.failures(), self.locked_until, now)
        } else {
            LockState::unlocked(self.failures())
        }
    }
}

/// Failure windows keyed by subject behind a single mutex. Every operation
/// is a short critical section with no awaits, which makes read-increment-lock
/// sequences atomic.
#[derive(Debug, Default)]
pub struct MemoryLockoutTracker {
    windows: Mutex<HashMap<SubjectKey, Window>>,
}

impl MemoryLockoutTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<SubjectKey, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of subjects currently tracked.
    #[must_use]
    pub fn tracked_subjects(&self) -> usize {
        self.windows().len()
    }
}

#[async_trait]
impl LockoutTracker for MemoryLockoutTracker {
    async fn record_failure(
        &self,
        subject: &SubjectKey,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<LockState> {
        let now = now.timestamp();
        let mut windows = self.windows();
        let window = windows.entry(subject.clone()).or_default();

        window.expire(policy, now);
        window.attempts.push(now);

        if policy.lockout_enabled()
            && window.locked_until.is_none()
            && window.failures() >= policy.login_max_attempts
        {
            let until = lock_deadline(policy, now);
            window.locked_until = Some(until);
            warn!(
                subject = %subject,
                failures = window.failures(),
                locked_until = until,
                "Lockout threshold reached"
            );
        }

        Ok(window.state(policy, now))
    }

    async fn lock_state(
        &self,
        subject: &SubjectKey,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<LockState> {
        let now = now.timestamp();
        let mut windows = self.windows();

        let Some(window) = windows.get_mut(subject) else {
            return Ok(LockState::unlocked(0));
        };

        window.expire(policy, now);
        Ok(window.state(policy, now))
    }

    async fn reset(&self, subject: &SubjectKey) -> anyhow::Result<()> {
        self.windows().remove(subject);
        Ok(())
    }

    async fn prune(&self, now: DateTime<Utc>, retention: Duration) -> anyhow::Result<u64> {
        let now = now.timestamp();
        let horizon = now.saturating_sub(i64::try_from(retention.as_secs()).unwrap_or(i64::MAX));
        let mut removed = 0_u64;

        self.windows().retain(|_, window| {
            if window.locked_until.is_some_and(|until| now > until) {
                window.locked_until = None;
            }

            let before = window.attempts.len();
            window.attempts.retain(|&ts| ts >= horizon);
            removed += (before - window.attempts.len()) as u64;

            window.locked_until.is_some() || !window.attempts.is_empty()
        });

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrincipalKind;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn policy() -> Policy {
        Policy {
            login_lockout_policy: true,
            login_max_attempts: 3,
            login_timeframe: 600,
            login_ban_time: 1800,
            ..Policy::default()
        }
    }

    fn subject() -> SubjectKey {
        SubjectKey::Principal {
            kind: PrincipalKind::User,
            id: 1,
        }
    }

    #[tokio::test]
    async fn test_locks_at_threshold() {
        let tracker = MemoryLockoutTracker::new();
        let policy = policy();

        assert!(!tracker.record_failure(&subject(), &policy, at(1000)).await.unwrap().locked);
        assert!(!tracker.record_failure(&subject(), &policy, at(1001)).await.unwrap().locked);
        let state = tracker.record_failure(&subject(), &policy, at(1002)).await.unwrap();
        assert!(state.locked);
        assert_eq!(state.failures, 3);
        assert_eq!(state.remaining, Some(Duration::from_secs(1800)));
    }

    #[tokio::test]
    async fn test_failures_age_out_of_window() {
        let tracker = MemoryLockoutTracker::new();
        let policy = policy();

        tracker.record_failure(&subject(), &policy, at(1000)).await.unwrap();
        tracker.record_failure(&subject(), &policy, at(1001)).await.unwrap();

        // both failures are older than the 600s window by now
        let state = tracker.record_failure(&subject(), &policy, at(1700)).await.unwrap();
        assert!(!state.locked);
        assert_eq!(state.failures, 1);
    }

    #[tokio::test]
    async fn test_ban_outlives_window_and_is_not_extended() {
        let tracker = MemoryLockoutTracker::new();
        let policy = policy();

        for t in [1000, 1001, 1002] {
            tracker.record_failure(&subject(), &policy, at(t)).await.unwrap();
        }

        // window has long passed but the ban still binds
        assert!(tracker.lock_state(&subject(), &policy, at(2500)).await.unwrap().locked);

        // more failures while locked do not push the deadline
        tracker.record_failure(&subject(), &policy, at(2700)).await.unwrap();
        assert!(tracker.lock_state(&subject(), &policy, at(2802)).await.unwrap().locked);

        let state = tracker.lock_state(&subject(), &policy, at(2803)).await.unwrap();
        assert!(!state.locked);
        assert_eq!(state.failures, 0);
    }

    #[tokio::test]
    async fn test_disabled_policy_never_locks() {
        let tracker = MemoryLockoutTracker::new();
        let policy = Policy {
            login_lockout_policy: false,
            ..policy()
        };

        for t in 0..10 {
            let state = tracker.record_failure(&subject(), &policy, at(1000 + t)).await.unwrap();
            assert!(!state.locked);
        }
        assert!(!tracker.lock_state(&subject(), &policy, at(1010)).await.unwrap().locked);
    }

    #[tokio::test]
    async fn test_reset_clears_subject() {
        let tracker = MemoryLockoutTracker::new();
        let policy = policy();

        for t in [1000, 1001, 1002] {
            tracker.record_failure(&subject(), &policy, at(t)).await.unwrap();
        }
        tracker.reset(&subject()).await.unwrap();

        let state = tracker.lock_state(&subject(), &policy, at(1003)).await.unwrap();
        assert_eq!(state, LockState::unlocked(0));
    }

    #[tokio::test]
    async fn test_prune_drops_stale_subjects() {
        let tracker = MemoryLockoutTracker::new();
        let policy = policy();

        tracker.record_failure(&subject(), &policy, at(1000)).await.unwrap();
        let other = SubjectKey::Ip("192.0.2.1".parse().unwrap());
        tracker.record_failure(&other, &policy, at(5000)).await.unwrap();

        let removed = tracker
            .prune(at(5000), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(tracker.tracked_subjects(), 1);
    }
}
