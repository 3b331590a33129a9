use anyhow::{Context, Result};
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use super::rfc3339;
use crate::entities::{password_history, principal_roles, principals};
use crate::models::{AccountStatus, Principal, PrincipalKind, normalize_identifier};

impl TryFrom<principals::Model> for Principal {
    type Error = anyhow::Error;

    fn try_from(model: principals::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            kind: model.kind.parse()?,
            username: model.username,
            email: model.email,
            status: model.status.parse()?,
            password_changed_at: model.password_changed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Everything needed to insert a principal; the hash is computed by the caller.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub kind: PrincipalKind,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub role_ids: Vec<i32>,
}

pub struct PrincipalRepository {
    conn: DatabaseConnection,
}

impl PrincipalRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert the principal, its role assignments and its first history entry
    /// in one transaction.
    pub async fn create(&self, new: NewPrincipal, now: i64) -> Result<Principal> {
        let timestamp = rfc3339(now);
        let txn = self.conn.begin().await?;

        let model = principals::ActiveModel {
            kind: Set(new.kind.as_str().to_string()),
            username: Set(normalize_identifier(&new.username)),
            email: Set(normalize_identifier(&new.email)),
            password_hash: Set(new.password_hash.clone()),
            status: Set(new.status.as_str().to_string()),
            password_changed_at: Set(now),
            created_at: Set(timestamp.clone()),
            updated_at: Set(timestamp),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert principal")?;

        if !new.role_ids.is_empty() {
            let rows = new.role_ids.iter().map(|role_id| principal_roles::ActiveModel {
                principal_id: Set(model.id),
                role_id: Set(*role_id),
            });
            principal_roles::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .context("Failed to assign roles")?;
        }

        password_history::ActiveModel {
            principal_id: Set(model.id),
            password_hash: Set(new.password_hash),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to append password history")?;

        txn.commit().await?;

        Principal::try_from(model)
    }

    /// Get principal by ID with password hash (for verification)
    pub async fn get_with_password(&self, id: i32) -> Result<Option<(Principal, String)>> {
        let principal = principals::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query principal by ID")?;

        principal.map(split_hash).transpose()
    }

    /// Case-insensitive lookup by username or email inside one namespace.
    pub async fn find_by_identifier(
        &self,
        kind: PrincipalKind,
        identifier: &str,
    ) -> Result<Option<(Principal, String)>> {
        let identifier = normalize_identifier(identifier);
        let principal = principals::Entity::find()
            .filter(principals::Column::Kind.eq(kind.as_str()))
            .filter(
                Condition::any()
                    .add(principals::Column::Username.eq(identifier.as_str()))
                    .add(principals::Column::Email.eq(identifier.as_str())),
            )
            .one(&self.conn)
            .await
            .context("Failed to query principal by identifier")?;

        principal.map(split_hash).transpose()
    }

    pub async fn find_by_email(&self, kind: PrincipalKind, email: &str) -> Result<Option<Principal>> {
        let principal = principals::Entity::find()
            .filter(principals::Column::Kind.eq(kind.as_str()))
            .filter(principals::Column::Email.eq(normalize_identifier(email)))
            .one(&self.conn)
            .await
            .context("Failed to query principal by email")?;

        principal.map(Principal::try_from).transpose()
    }

    /// Replace the password hash and optionally append it to the history,
    /// atomically.
    pub async fn update_password(
        &self,
        id: i32,
        password_hash: &str,
        now: i64,
        record_history: bool,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;
        write_password(&txn, id, password_hash, now, record_history).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Status transitions are the only form of deletion.
    pub async fn set_status(&self, id: i32, status: AccountStatus, now: i64) -> Result<bool> {
        let Some(principal) = principals::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query principal for status update")?
        else {
            return Ok(false);
        };

        let mut active: principals::ActiveModel = principal.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(rfc3339(now));
        active.update(&self.conn).await?;

        Ok(true)
    }
}

/// Shared by the authenticated change path and reset redemption, which runs it
/// inside its own transaction.
pub(crate) async fn write_password<C>(
    db: &C,
    id: i32,
    password_hash: &str,
    now: i64,
    record_history: bool,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let principal = principals::Entity::find_by_id(id)
        .one(db)
        .await
        .context("Failed to query principal for password update")?
        .ok_or_else(|| anyhow::anyhow!("Principal not found: {id}"))?;

    let mut active: principals::ActiveModel = principal.into();
    active.password_hash = Set(password_hash.to_string());
    active.password_changed_at = Set(now);
    active.updated_at = Set(rfc3339(now));
    active.update(db).await?;

    if record_history {
        password_history::ActiveModel {
            principal_id: Set(id),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .context("Failed to append password history")?;
    }

    Ok(())
}

fn split_hash(model: principals::Model) -> Result<(Principal, String)> {
    let password_hash = model.password_hash.clone();
    Ok((Principal::try_from(model)?, password_hash))
}
