pub mod app_key_gate;
pub use app_key_gate::AppKeyGate;

pub mod auth_service;
pub use auth_service::{
    AuthError, AuthService, Authorized, ChangePasswordRequest, DenyReason, FieldErrors,
    LoginRequest, NewPrincipalRequest, RedeemResetRequest, ResetRequested,
};

pub mod auth_service_impl;
pub use auth_service_impl::{SeaOrmAuthService, generate_reset_code};

pub mod hasher;
pub use hasher::{Argon2Hasher, BcryptHasher, CredentialHasher, HashPool, hasher_for};

pub mod lockout;
pub use lockout::{LockState, LockoutTracker, SubjectKey, covering_retention, spawn_pruner};

pub mod lockout_memory;
pub use lockout_memory::MemoryLockoutTracker;

pub mod lockout_store;
pub use lockout_store::DatabaseLockoutTracker;

pub mod notify;
pub use notify::{Channel, LogNotifier, Notification, Notifier, WebhookNotifier};

pub mod password_policy;
pub use password_policy::{PolicyError, validate_complexity, validate_confirmation, validate_reuse};
