use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{principal_roles, roles};
use crate::models::{Policy, Role};

fn clamp_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn clamp_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl From<roles::Model> for Role {
    fn from(model: roles::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            policy: Policy {
                login_lockout_policy: model.login_lockout_policy,
                login_max_attempts: clamp_u32(model.login_max_attempts),
                login_timeframe: clamp_u64(model.login_timeframe),
                login_ban_time: clamp_u64(model.login_ban_time),
                login_ban_by_ip: model.login_ban_by_ip,
                password_policy: model.password_policy,
                password_reuse_history: clamp_u32(model.password_reuse_history),
                password_reset_days: clamp_u32(model.password_reset_days),
            },
        }
    }
}

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, name: &str, policy: &Policy, now: i64) -> Result<Role> {
        let model = roles::ActiveModel {
            name: Set(name.trim().to_string()),
            login_lockout_policy: Set(policy.login_lockout_policy),
            login_max_attempts: Set(i32::try_from(policy.login_max_attempts)?),
            login_timeframe: Set(i64::try_from(policy.login_timeframe)?),
            login_ban_time: Set(i64::try_from(policy.login_ban_time)?),
            login_ban_by_ip: Set(policy.login_ban_by_ip),
            password_policy: Set(policy.password_policy),
            password_reuse_history: Set(i32::try_from(policy.password_reuse_history)?),
            password_reset_days: Set(i32::try_from(policy.password_reset_days)?),
            created_at: Set(super::rfc3339(now)),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .with_context(|| format!("Failed to insert role {name}"))?;

        Ok(Role::from(model))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = roles::Entity::find()
            .filter(roles::Column::Name.eq(name.trim()))
            .one(&self.conn)
            .await
            .context("Failed to query role by name")?;

        Ok(role.map(Role::from))
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        let roles = roles::Entity::find()
            .order_by_asc(roles::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list roles")?;

        Ok(roles.into_iter().map(Role::from).collect())
    }

    /// The primary role is the assigned role with the lowest id; its policy
    /// governs lockout and password rules. No role means no rules.
    pub async fn resolve_policy(&self, principal_id: i32) -> Result<Policy> {
        let assignment = principal_roles::Entity::find()
            .filter(principal_roles::Column::PrincipalId.eq(principal_id))
            .order_by_asc(principal_roles::Column::RoleId)
            .one(&self.conn)
            .await
            .context("Failed to query role assignment")?;

        let Some(assignment) = assignment else {
            return Ok(Policy::default());
        };

        let role = roles::Entity::find_by_id(assignment.role_id)
            .one(&self.conn)
            .await
            .context("Failed to query primary role")?;

        Ok(role.map(|r| Role::from(r).policy).unwrap_or_default())
    }
}
