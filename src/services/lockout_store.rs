//! Lockout tracker backed by the shared database, for deployments where more
//! than one process authenticates against the same accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;

use super::lockout::{LockState, LockoutTracker, SubjectKey, saturating_secs};
use crate::db::Store;
use crate::models::Policy;

pub struct DatabaseLockoutTracker {
    store: Store,
}

impl DatabaseLockoutTracker {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LockoutTracker for DatabaseLockoutTracker {
    async fn record_failure(
        &self,
        subject: &SubjectKey,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<LockState> {
        let state = self
            .store
            .record_login_failure(&subject.to_string(), policy, now.timestamp())
            .await?;

        // a lock triggered by this failure has its full ban ahead of it
        if state.locked && state.remaining == Some(policy.ban_time()) {
            warn!(
                subject = %subject,
                failures = state.failures,
                "Lockout threshold reached"
            );
        }

        Ok(state)
    }

    async fn lock_state(
        &self,
        subject: &SubjectKey,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<LockState> {
        self.store
            .login_lock_state(&subject.to_string(), policy, now.timestamp())
            .await
    }

    async fn reset(&self, subject: &SubjectKey) -> anyhow::Result<()> {
        self.store.reset_login_attempts(&subject.to_string()).await
    }

    async fn prune(&self, now: DateTime<Utc>, retention: Duration) -> anyhow::Result<u64> {
        let now = now.timestamp();
        let horizon = now.saturating_sub(saturating_secs(retention.as_secs()));
        self.store.prune_login_attempts(now, horizon).await
    }
}
