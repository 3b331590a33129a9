use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::app_keys;
use crate::models::{AppKey, KeyStatus};

impl TryFrom<app_keys::Model> for AppKey {
    type Error = anyhow::Error;

    fn try_from(model: app_keys::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            key: model.key,
            application: model.application,
            status: model.status.parse()?,
            created_at: model.created_at,
        })
    }
}

pub struct AppKeyRepository {
    conn: DatabaseConnection,
}

impl AppKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, application: &str, status: KeyStatus, now: i64) -> Result<AppKey> {
        let model = app_keys::ActiveModel {
            key: Set(generate_app_key()),
            application: Set(application.trim().to_string()),
            status: Set(status.as_str().to_string()),
            created_at: Set(super::rfc3339(now)),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert application key")?;

        AppKey::try_from(model)
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<AppKey>> {
        let model = app_keys::Entity::find()
            .filter(app_keys::Column::Key.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query application key")?;

        model.map(AppKey::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<AppKey>> {
        let models = app_keys::Entity::find()
            .order_by_asc(app_keys::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list application keys")?;

        models.into_iter().map(AppKey::try_from).collect()
    }

    pub async fn set_status(&self, key: &str, status: KeyStatus) -> Result<bool> {
        let Some(model) = app_keys::Entity::find()
            .filter(app_keys::Column::Key.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query application key for status update")?
        else {
            return Ok(false);
        };

        let mut active: app_keys::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.update(&self.conn).await?;

        Ok(true)
    }
}

/// Generate a random application key (64 character hex string)
#[must_use]
pub fn generate_app_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
