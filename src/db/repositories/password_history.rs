use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::password_history;

pub struct PasswordHistoryRepository {
    conn: DatabaseConnection,
}

impl PasswordHistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The `limit` most recent hashes for a principal, newest first.
    pub async fn recent_hashes(&self, principal_id: i32, limit: u32) -> Result<Vec<String>> {
        let entries = password_history::Entity::find()
            .filter(password_history::Column::PrincipalId.eq(principal_id))
            .order_by_desc(password_history::Column::CreatedAt)
            .order_by_desc(password_history::Column::Id)
            .limit(u64::from(limit))
            .all(&self.conn)
            .await
            .context("Failed to query password history")?;

        Ok(entries.into_iter().map(|e| e.password_hash).collect())
    }
}
