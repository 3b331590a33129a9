use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, LockoutBackend, NotifyConfig};
use crate::db::Store;
use crate::services::{
    AuthService, DatabaseLockoutTracker, HashPool, LockoutTracker, LogNotifier,
    MemoryLockoutTracker, Notifier, SeaOrmAuthService, WebhookNotifier, hasher_for, spawn_pruner,
};

fn build_notifier(config: &NotifyConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    Ok(match &config.webhook_url {
        Some(url) => {
            info!(url = %url, "Delivering notifications by webhook");
            Arc::new(WebhookNotifier::new(
                url,
                Duration::from_secs(config.timeout_seconds),
            )?)
        }
        None => Arc::new(LogNotifier),
    })
}

fn build_tracker(backend: LockoutBackend, store: &Store) -> Arc<dyn LockoutTracker> {
    match backend {
        LockoutBackend::Memory => Arc::new(MemoryLockoutTracker::new()),
        LockoutBackend::Database => Arc::new(DatabaseLockoutTracker::new(store.clone())),
    }
}

/// Everything a caller needs to run the account security subsystem.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub clock: Arc<dyn Clock>,

    pub tracker: Arc<dyn LockoutTracker>,

    pub hashes: HashPool,

    pub auth: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store, Arc::new(SystemClock))
    }

    /// Wire the services around an existing store and clock.
    pub fn with_store(
        config: Config,
        store: Store,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let notifier = build_notifier(&config.notify)?;
        Self::with_notifier(config, store, clock, notifier)
    }

    pub fn with_notifier(
        config: Config,
        store: Store,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let hashes = HashPool::new(hasher_for(&config.security)?, config.security.hash_workers);
        Ok(Self::assemble(config, store, clock, notifier, hashes))
    }

    /// Same as [`Self::with_notifier`] with a caller-supplied hash pool.
    #[must_use]
    pub fn assemble(
        config: Config,
        store: Store,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        hashes: HashPool,
    ) -> Self {
        let tracker = build_tracker(config.lockout.backend, &store);

        let auth = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tracker.clone(),
            hashes.clone(),
            notifier,
            clock.clone(),
            config.reset.clone(),
        )) as Arc<dyn AuthService>;

        info!(
            backend = ?config.lockout.backend,
            hash_algorithm = ?hashes.algorithm(),
            "Account security services ready"
        );

        Self {
            config: Arc::new(config),
            store,
            clock,
            tracker,
            hashes,
            auth,
        }
    }

    /// Start the periodic lockout pruner configured under `[lockout]`, unless
    /// its interval is 0.
    #[must_use]
    pub fn spawn_pruner(&self) -> Option<JoinHandle<()>> {
        let lockout = &self.config.lockout;
        if lockout.prune_interval_seconds == 0 {
            return None;
        }

        Some(spawn_pruner(
            self.tracker.clone(),
            self.store.clone(),
            self.clock.clone(),
            Duration::from_secs(lockout.prune_interval_seconds),
            Duration::from_secs(lockout.attempt_retention_seconds),
        ))
    }
}
