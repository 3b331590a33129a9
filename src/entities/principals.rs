use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "principals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `admin` or `user`; username and email are unique per kind.
    pub kind: String,

    pub username: String,

    pub email: String,

    pub password_hash: String,

    pub status: String,

    /// Unix seconds.
    pub password_changed_at: i64,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
