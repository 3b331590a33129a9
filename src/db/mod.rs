use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::{AccountStatus, AppKey, KeyStatus, Policy, Principal, PrincipalKind, Role};
use crate::services::lockout::LockState;

pub mod migrator;
pub mod repositories;

pub use repositories::principal::NewPrincipal;
pub use repositories::reset_code::ResetCode;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // every connection to `:memory:` is its own database; keep the one we
        // migrated alive for the lifetime of the pool
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Single-connection in-memory store, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        Self::with_pool_options("sqlite::memory:", 1, 1).await
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn principal_repo(&self) -> repositories::principal::PrincipalRepository {
        repositories::principal::PrincipalRepository::new(self.conn.clone())
    }

    fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    fn history_repo(&self) -> repositories::password_history::PasswordHistoryRepository {
        repositories::password_history::PasswordHistoryRepository::new(self.conn.clone())
    }

    fn reset_code_repo(&self) -> repositories::reset_code::ResetCodeRepository {
        repositories::reset_code::ResetCodeRepository::new(self.conn.clone())
    }

    fn app_key_repo(&self) -> repositories::app_key::AppKeyRepository {
        repositories::app_key::AppKeyRepository::new(self.conn.clone())
    }

    fn login_attempt_repo(&self) -> repositories::login_attempt::LoginAttemptRepository {
        repositories::login_attempt::LoginAttemptRepository::new(self.conn.clone())
    }

    // Principals

    pub async fn create_principal(&self, new: NewPrincipal, now: i64) -> Result<Principal> {
        self.principal_repo().create(new, now).await
    }

    pub async fn get_principal_with_password(
        &self,
        id: i32,
    ) -> Result<Option<(Principal, String)>> {
        self.principal_repo().get_with_password(id).await
    }

    pub async fn find_principal(
        &self,
        kind: PrincipalKind,
        identifier: &str,
    ) -> Result<Option<(Principal, String)>> {
        self.principal_repo().find_by_identifier(kind, identifier).await
    }

    pub async fn find_principal_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> Result<Option<Principal>> {
        self.principal_repo().find_by_email(kind, email).await
    }

    pub async fn update_principal_password(
        &self,
        id: i32,
        password_hash: &str,
        now: i64,
        record_history: bool,
    ) -> Result<()> {
        self.principal_repo()
            .update_password(id, password_hash, now, record_history)
            .await
    }

    pub async fn set_principal_status(
        &self,
        id: i32,
        status: AccountStatus,
        now: i64,
    ) -> Result<bool> {
        self.principal_repo().set_status(id, status, now).await
    }

    // Roles

    pub async fn create_role(&self, name: &str, policy: &Policy, now: i64) -> Result<Role> {
        self.role_repo().create(name, policy, now).await
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.role_repo().get_by_name(name).await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.role_repo().list().await
    }

    /// Largest `login_timeframe` across all roles, in seconds.
    pub async fn longest_login_timeframe(&self) -> Result<u64> {
        let roles = self.role_repo().list().await?;
        Ok(roles
            .iter()
            .map(|r| r.policy.login_timeframe)
            .max()
            .unwrap_or(0))
    }

    pub async fn resolve_policy(&self, principal_id: i32) -> Result<Policy> {
        self.role_repo().resolve_policy(principal_id).await
    }

    // Password history

    pub async fn recent_password_hashes(&self, principal_id: i32, limit: u32) -> Result<Vec<String>> {
        self.history_repo().recent_hashes(principal_id, limit).await
    }

    // Reset codes

    pub async fn issue_reset_code(
        &self,
        principal_id: i32,
        code: &str,
        issued_at: i64,
        ip: Option<&str>,
    ) -> Result<ResetCode> {
        self.reset_code_repo()
            .issue(principal_id, code, issued_at, ip)
            .await
    }

    pub async fn latest_reset_code(&self, principal_id: i32) -> Result<Option<ResetCode>> {
        self.reset_code_repo().latest_unconsumed(principal_id).await
    }

    pub async fn redeem_reset_code(
        &self,
        code_id: i32,
        principal_id: i32,
        password_hash: &str,
        now: i64,
        record_history: bool,
    ) -> Result<bool> {
        self.reset_code_repo()
            .redeem(code_id, principal_id, password_hash, now, record_history)
            .await
    }

    // Application keys

    pub async fn create_app_key(
        &self,
        application: &str,
        status: KeyStatus,
        now: i64,
    ) -> Result<AppKey> {
        self.app_key_repo().create(application, status, now).await
    }

    pub async fn find_app_key(&self, key: &str) -> Result<Option<AppKey>> {
        self.app_key_repo().find_by_key(key).await
    }

    pub async fn list_app_keys(&self) -> Result<Vec<AppKey>> {
        self.app_key_repo().list().await
    }

    pub async fn set_app_key_status(&self, key: &str, status: KeyStatus) -> Result<bool> {
        self.app_key_repo().set_status(key, status).await
    }

    // Login attempts

    pub async fn record_login_failure(
        &self,
        subject: &str,
        policy: &Policy,
        now: i64,
    ) -> Result<LockState> {
        self.login_attempt_repo()
            .record_failure(subject, policy, now)
            .await
    }

    pub async fn login_lock_state(&self, subject: &str, policy: &Policy, now: i64) -> Result<LockState> {
        self.login_attempt_repo().lock_state(subject, policy, now).await
    }

    pub async fn reset_login_attempts(&self, subject: &str) -> Result<()> {
        self.login_attempt_repo().reset(subject).await
    }

    pub async fn prune_login_attempts(&self, now: i64, horizon: i64) -> Result<u64> {
        self.login_attempt_repo().prune(now, horizon).await
    }
}
