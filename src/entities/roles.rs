use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub login_lockout_policy: bool,

    pub login_max_attempts: i32,

    /// Seconds.
    pub login_timeframe: i64,

    /// Seconds.
    pub login_ban_time: i64,

    pub login_ban_by_ip: bool,

    pub password_policy: bool,

    pub password_reuse_history: i32,

    pub password_reset_days: i32,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
