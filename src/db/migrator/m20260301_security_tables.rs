use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

use crate::entities::{
    app_keys, login_attempts, login_locks, password_history, password_reset_codes,
    principal_roles, principals, roles,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create_from_entity<E>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        create_from_entity(manager, &schema, roles::Entity).await?;
        create_from_entity(manager, &schema, principals::Entity).await?;
        create_from_entity(manager, &schema, principal_roles::Entity).await?;
        create_from_entity(manager, &schema, password_history::Entity).await?;
        create_from_entity(manager, &schema, password_reset_codes::Entity).await?;
        create_from_entity(manager, &schema, app_keys::Entity).await?;
        create_from_entity(manager, &schema, login_attempts::Entity).await?;
        create_from_entity(manager, &schema, login_locks::Entity).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_principals_kind_username")
                    .table(principals::Entity)
                    .col(principals::Column::Kind)
                    .col(principals::Column::Username)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_principals_kind_email")
                    .table(principals::Entity)
                    .col(principals::Column::Kind)
                    .col(principals::Column::Email)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_password_history_principal")
                    .table(password_history::Entity)
                    .col(password_history::Column::PrincipalId)
                    .col(password_history::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_password_reset_codes_principal")
                    .table(password_reset_codes::Entity)
                    .col(password_reset_codes::Column::PrincipalId)
                    .col(password_reset_codes::Column::Consumed)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_attempts_subject")
                    .table(login_attempts::Entity)
                    .col(login_attempts::Column::Subject)
                    .col(login_attempts::Column::AttemptedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        seed_roles(manager).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(login_locks::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(login_attempts::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(app_keys::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(password_reset_codes::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(password_history::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(principal_roles::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(principals::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(roles::Entity).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

/// Seed the two namespaces' default roles. Administrators get the stricter
/// policy.
async fn seed_roles(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    let insert = sea_orm_migration::sea_query::Query::insert()
        .into_table(roles::Entity)
        .columns([
            roles::Column::Name,
            roles::Column::LoginLockoutPolicy,
            roles::Column::LoginMaxAttempts,
            roles::Column::LoginTimeframe,
            roles::Column::LoginBanTime,
            roles::Column::LoginBanByIp,
            roles::Column::PasswordPolicy,
            roles::Column::PasswordReuseHistory,
            roles::Column::PasswordResetDays,
            roles::Column::CreatedAt,
        ])
        .values_panic([
            "administrator".into(),
            true.into(),
            5.into(),
            900_i64.into(),
            1800_i64.into(),
            false.into(),
            true.into(),
            5.into(),
            90.into(),
            now.clone().into(),
        ])
        .values_panic([
            "user".into(),
            true.into(),
            5.into(),
            600_i64.into(),
            900_i64.into(),
            false.into(),
            true.into(),
            3.into(),
            0.into(),
            now.into(),
        ])
        .to_owned();

    manager.exec_stmt(insert).await?;

    Ok(())
}
