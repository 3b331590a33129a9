#![allow(dead_code)]

use async_trait::async_trait;
use gatekeeper::SharedState;
use gatekeeper::clock::{Clock, ManualClock};
use gatekeeper::config::{Config, HashAlgorithm, LockoutBackend};
use gatekeeper::db::Store;
use gatekeeper::models::{AccountStatus, KeyStatus, Policy, Principal, PrincipalKind};
use gatekeeper::services::{
    BcryptHasher, CredentialHasher, HashPool, LoginRequest, NewPrincipalRequest, Notification,
    Notifier,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const START: i64 = 1_700_000_000;

/// Bcrypt at the minimum cost, counting every comparison.
#[derive(Default)]
pub struct CountingHasher {
    verifies: AtomicUsize,
}

impl CountingHasher {
    pub fn verifies(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }
}

impl CredentialHasher for CountingHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Bcrypt
    }

    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        BcryptHasher::new(4).hash(plain)
    }

    fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        BcryptHasher::new(4).verify(plain, hash)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn last_code(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .last()
            .and_then(|n| n.vars.get("code").cloned())
            .expect("no reset code was sent")
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<bool> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(true)
    }
}

pub struct Harness {
    pub state: SharedState,
    pub clock: Arc<ManualClock>,
    pub hasher: Arc<CountingHasher>,
    pub notifier: Arc<RecordingNotifier>,
    pub app_key: String,
}

pub async fn harness(backend: LockoutBackend) -> Harness {
    harness_with(backend, |_| {}).await
}

pub async fn harness_with(backend: LockoutBackend, tweak: impl FnOnce(&mut Config)) -> Harness {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.lockout.backend = backend;
    tweak(&mut config);

    let store = Store::in_memory().await.unwrap();
    let clock = Arc::new(ManualClock::at_unix(START));
    let hasher = Arc::new(CountingHasher::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let app_key = store
        .create_app_key("test-suite", KeyStatus::Enabled, START)
        .await
        .unwrap()
        .key;

    let state = SharedState::assemble(
        config,
        store,
        clock.clone() as Arc<dyn Clock>,
        notifier.clone(),
        HashPool::new(hasher.clone(), 4),
    );

    Harness {
        state,
        clock,
        hasher,
        notifier,
        app_key,
    }
}

impl Harness {
    pub async fn role(&self, name: &str, policy: Policy) {
        self.state
            .store
            .create_role(name, &policy, self.clock.unix())
            .await
            .unwrap();
    }

    pub async fn user(&self, username: &str, password: &str, role: &str) -> Principal {
        self.state
            .auth
            .create_principal(&NewPrincipalRequest {
                kind: PrincipalKind::User,
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: password.to_string(),
                status: AccountStatus::Enabled,
                roles: vec![role.to_string()],
            })
            .await
            .unwrap()
    }

    pub fn login(&self, identifier: &str, password: &str) -> LoginRequest {
        LoginRequest {
            app_key: Some(self.app_key.clone()),
            kind: PrincipalKind::User,
            identifier: identifier.to_string(),
            password: password.to_string(),
            ip: None,
        }
    }
}

/// 3 failures in 600s lock for 1800s.
pub fn strict_policy() -> Policy {
    Policy {
        login_lockout_policy: true,
        login_max_attempts: 3,
        login_timeframe: 600,
        login_ban_time: 1800,
        login_ban_by_ip: false,
        password_policy: true,
        password_reuse_history: 2,
        password_reset_days: 0,
    }
}
