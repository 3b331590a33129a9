use sea_orm::entity::prelude::*;

/// One failed authentication against a lockout subject.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "login_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `principal:<kind>:<id>` or `ip:<addr>`.
    pub subject: String,

    /// Unix seconds.
    pub attempted_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
