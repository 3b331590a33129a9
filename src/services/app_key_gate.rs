use tracing::debug;

use super::auth_service::AuthError;
use crate::db::Store;
use crate::models::AppKey;

/// Validates the caller's application key. Runs before any principal lookup,
/// so unkeyed callers learn nothing about accounts.
#[derive(Clone)]
pub struct AppKeyGate {
    store: Store,
}

impl AppKeyGate {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn check(&self, key: Option<&str>) -> Result<AppKey, AuthError> {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            debug!("Request without application key");
            return Err(AuthError::MissingKey);
        };

        let Some(app_key) = self.store.find_app_key(key).await? else {
            debug!("Unknown application key");
            return Err(AuthError::InvalidKey);
        };

        if !app_key.status.is_accepted() {
            debug!(
                application = %app_key.application,
                status = %app_key.status,
                "Application key not accepted"
            );
            return Err(AuthError::InvalidKey);
        }

        Ok(app_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyStatus;

    #[tokio::test]
    async fn test_gate_statuses() {
        let store = Store::in_memory().await.unwrap();
        let gate = AppKeyGate::new(store.clone());

        assert!(matches!(gate.check(None).await, Err(AuthError::MissingKey)));
        assert!(matches!(gate.check(Some("  ")).await, Err(AuthError::MissingKey)));
        assert!(matches!(gate.check(Some("nope")).await, Err(AuthError::InvalidKey)));

        for status in [KeyStatus::Enabled, KeyStatus::Disabled, KeyStatus::Pending] {
            let key = store.create_app_key("portal", status, 0).await.unwrap();
            assert_eq!(gate.check(Some(&key.key)).await.unwrap().id, key.id);
        }

        for status in [KeyStatus::Archived, KeyStatus::Deleted] {
            let key = store.create_app_key("legacy", status, 0).await.unwrap();
            assert!(matches!(
                gate.check(Some(&key.key)).await,
                Err(AuthError::InvalidKey)
            ));
        }
    }
}
