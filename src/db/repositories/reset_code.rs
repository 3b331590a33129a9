use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::principal::write_password;
use crate::entities::password_reset_codes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCode {
    pub id: i32,
    pub principal_id: i32,
    pub code: String,
    pub issued_at: i64,
    pub consumed: bool,
    pub ip: Option<String>,
}

impl From<password_reset_codes::Model> for ResetCode {
    fn from(model: password_reset_codes::Model) -> Self {
        Self {
            id: model.id,
            principal_id: model.principal_id,
            code: model.code,
            issued_at: model.issued_at,
            consumed: model.consumed,
            ip: model.ip,
        }
    }
}

pub struct ResetCodeRepository {
    conn: DatabaseConnection,
}

impl ResetCodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Store a new code and retire every earlier unconsumed code of the
    /// principal in the same transaction.
    pub async fn issue(
        &self,
        principal_id: i32,
        code: &str,
        issued_at: i64,
        ip: Option<&str>,
    ) -> Result<ResetCode> {
        let txn = self.conn.begin().await?;

        password_reset_codes::Entity::update_many()
            .col_expr(password_reset_codes::Column::Consumed, Expr::value(true))
            .filter(password_reset_codes::Column::PrincipalId.eq(principal_id))
            .filter(password_reset_codes::Column::Consumed.eq(false))
            .exec(&txn)
            .await
            .context("Failed to retire earlier password reset codes")?;

        let model = password_reset_codes::ActiveModel {
            principal_id: Set(principal_id),
            code: Set(code.to_string()),
            issued_at: Set(issued_at),
            consumed: Set(false),
            ip: Set(ip.map(str::to_string)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert password reset code")?;

        txn.commit().await?;
        Ok(ResetCode::from(model))
    }

    /// The most recently issued code that has not been consumed.
    pub async fn latest_unconsumed(&self, principal_id: i32) -> Result<Option<ResetCode>> {
        let model = password_reset_codes::Entity::find()
            .filter(password_reset_codes::Column::PrincipalId.eq(principal_id))
            .filter(password_reset_codes::Column::Consumed.eq(false))
            .order_by_desc(password_reset_codes::Column::IssuedAt)
            .order_by_desc(password_reset_codes::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query password reset code")?;

        Ok(model.map(ResetCode::from))
    }

    /// Consume the code and set the new password in one transaction.
    ///
    /// The consume is a compare-and-set on `consumed = false`; returns `false`
    /// without touching the password when another redemption got there first.
    pub async fn redeem(
        &self,
        code_id: i32,
        principal_id: i32,
        password_hash: &str,
        now: i64,
        record_history: bool,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let consumed = password_reset_codes::Entity::update_many()
            .col_expr(password_reset_codes::Column::Consumed, Expr::value(true))
            .filter(password_reset_codes::Column::Id.eq(code_id))
            .filter(password_reset_codes::Column::Consumed.eq(false))
            .exec(&txn)
            .await
            .context("Failed to consume password reset code")?;

        if consumed.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(false);
        }

        write_password(&txn, principal_id, password_hash, now, record_history).await?;
        txn.commit().await?;

        Ok(true)
    }
}
