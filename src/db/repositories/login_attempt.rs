use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};

use crate::entities::{login_attempts, login_locks};
use crate::models::Policy;
use crate::services::lockout::{LockState, lock_deadline, window_start};

pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a failure and re-evaluate the lock in one transaction.
    ///
    /// The insert runs first so the transaction holds the write lock before it
    /// reads anything; concurrent failures for a subject serialize behind it.
    pub async fn record_failure(&self, subject: &str, policy: &Policy, now: i64) -> Result<LockState> {
        let txn = self.conn.begin().await?;

        let attempt = login_attempts::ActiveModel {
            subject: Set(subject.to_string()),
            attempted_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to record login attempt")?;

        let mut locked_until = active_lock(&txn, subject, now, Some(attempt.id)).await?;

        login_attempts::Entity::delete_many()
            .filter(login_attempts::Column::Subject.eq(subject))
            .filter(login_attempts::Column::AttemptedAt.lt(window_start(policy, now)))
            .exec(&txn)
            .await
            .context("Failed to prune login attempts")?;

        let failures = count_failures(&txn, subject).await?;

        if policy.lockout_enabled() && locked_until.is_none() && failures >= policy.login_max_attempts {
            let until = lock_deadline(policy, now);
            login_locks::ActiveModel {
                subject: Set(subject.to_string()),
                locked_at: Set(now),
                locked_until: Set(until),
            }
            .insert(&txn)
            .await
            .context("Failed to store login lock")?;
            locked_until = Some(until);
        }

        txn.commit().await?;

        if policy.lockout_enabled() {
            Ok(LockState::evaluate(failures, locked_until, now))
        } else {
            Ok(LockState::unlocked(failures))
        }
    }

    pub async fn lock_state(&self, subject: &str, policy: &Policy, now: i64) -> Result<LockState> {
        let txn = self.conn.begin().await?;

        let locked_until = active_lock(&txn, subject, now, None).await?;

        let failures = login_attempts::Entity::find()
            .filter(login_attempts::Column::Subject.eq(subject))
            .filter(login_attempts::Column::AttemptedAt.gte(window_start(policy, now)))
            .count(&txn)
            .await
            .context("Failed to count login attempts")?;

        txn.commit().await?;

        let failures = u32::try_from(failures).unwrap_or(u32::MAX);
        if policy.lockout_enabled() {
            Ok(LockState::evaluate(failures, locked_until, now))
        } else {
            Ok(LockState::unlocked(failures))
        }
    }

    pub async fn reset(&self, subject: &str) -> Result<()> {
        let txn = self.conn.begin().await?;

        login_attempts::Entity::delete_many()
            .filter(login_attempts::Column::Subject.eq(subject))
            .exec(&txn)
            .await
            .context("Failed to clear login attempts")?;

        login_locks::Entity::delete_by_id(subject.to_string())
            .exec(&txn)
            .await
            .context("Failed to clear login lock")?;

        txn.commit().await?;
        Ok(())
    }

    /// Delete attempts older than `horizon` and locks that have run out.
    pub async fn prune(&self, now: i64, horizon: i64) -> Result<u64> {
        let attempts = login_attempts::Entity::delete_many()
            .filter(login_attempts::Column::AttemptedAt.lt(horizon))
            .exec(&self.conn)
            .await
            .context("Failed to prune login attempts")?;

        let locks = login_locks::Entity::delete_many()
            .filter(login_locks::Column::LockedUntil.lt(now))
            .exec(&self.conn)
            .await
            .context("Failed to prune login locks")?;

        Ok(attempts.rows_affected + locks.rows_affected)
    }
}

/// Deadline of the subject's lock if it is still in effect. An elapsed lock is
/// removed together with every failure except `keep`, starting a fresh window.
async fn active_lock<C>(db: &C, subject: &str, now: i64, keep: Option<i32>) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    let Some(lock) = login_locks::Entity::find_by_id(subject.to_string())
        .one(db)
        .await
        .context("Failed to query login lock")?
    else {
        return Ok(None);
    };

    if now <= lock.locked_until {
        return Ok(Some(lock.locked_until));
    }

    login_locks::Entity::delete_by_id(subject.to_string())
        .exec(db)
        .await
        .context("Failed to lift login lock")?;

    let mut stale = login_attempts::Entity::delete_many()
        .filter(login_attempts::Column::Subject.eq(subject));
    if let Some(id) = keep {
        stale = stale.filter(login_attempts::Column::Id.ne(id));
    }
    stale.exec(db).await.context("Failed to reset login attempts")?;

    Ok(None)
}

async fn count_failures<C>(db: &C, subject: &str) -> Result<u32>
where
    C: ConnectionTrait,
{
    let count = login_attempts::Entity::find()
        .filter(login_attempts::Column::Subject.eq(subject))
        .count(db)
        .await
        .context("Failed to count login attempts")?;

    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}
