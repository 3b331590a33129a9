//! Domain service for account security.
//!
//! Covers the application-key gate, credential verification with lockout,
//! password changes and the password reset flow.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

use crate::constants::{fields, messages};
use crate::models::{AccountStatus, AppKey, Principal, PrincipalKind};

/// Why a login was refused. Both reasons render as the same message so
/// callers cannot tell a locked account from a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Locked,
    BadCredentials,
}

impl DenyReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::BadCredentials => "bad_credentials",
        }
    }
}

/// Validation failures keyed by field, every failing field in one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok` when nothing was recorded.
    pub fn into_result(self) -> Result<(), AuthError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors specific to account security operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", messages::MISSING_APP_KEY)]
    MissingKey,

    #[error("{}", messages::BAD_APP_KEY)]
    InvalidKey,

    #[error("{}", messages::BAD_CREDENTIALS)]
    Unauthorized(DenyReason),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{}", messages::INVALID_CODE)]
    InvalidCode,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for a reset code that was wrong, expired or already consumed,
    /// whether reported alone or among other field errors.
    #[must_use]
    pub fn is_invalid_code(&self) -> bool {
        match self {
            Self::InvalidCode => true,
            Self::Validation(errors) => errors.contains(fields::CODE),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub app_key: Option<String>,
    pub kind: PrincipalKind,
    /// Username or email, matched case-insensitively.
    pub identifier: String,
    pub password: String,
    pub ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Authorized {
    pub principal: Principal,
    /// The password is older than the role's `password_reset_days`.
    pub password_expired: bool,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub previous_password: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct RedeemResetRequest {
    pub email: String,
    pub code: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetRequested {
    pub sent: bool,
}

#[derive(Debug, Clone)]
pub struct NewPrincipalRequest {
    pub kind: PrincipalKind,
    pub username: String,
    pub email: String,
    pub password: String,
    pub status: AccountStatus,
    /// Role names; empty assigns the kind's default role.
    pub roles: Vec<String>,
}

/// Domain service trait for account security.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks an application key before anything else about the request.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingKey`] when no key was supplied,
    /// [`AuthError::InvalidKey`] when it is unknown or not in an accepted status.
    async fn gate(&self, app_key: Option<&str>) -> Result<AppKey, AuthError>;

    /// Runs the full credential verifier: gate, lockout check, password
    /// comparison, attempt bookkeeping.
    ///
    /// # Errors
    ///
    /// Gate errors, or [`AuthError::Unauthorized`] for unknown principals,
    /// wrong passwords and locked subjects alike.
    async fn authenticate(&self, request: &LoginRequest) -> Result<Authorized, AuthError>;

    /// # Errors
    ///
    /// [`AuthError::Validation`] with keys `previous_password`, `password1`
    /// and `password2`.
    async fn change_password(
        &self,
        principal_id: i32,
        request: &ChangePasswordRequest,
    ) -> Result<(), AuthError>;

    async fn request_password_reset(
        &self,
        email: &str,
        ip: Option<IpAddr>,
    ) -> Result<ResetRequested, AuthError>;

    /// # Errors
    ///
    /// [`AuthError::Validation`] with keys `email`, `code`, `password1` and
    /// `password2`, or [`AuthError::InvalidCode`] when a concurrent
    /// redemption consumed the code first.
    async fn redeem_password_reset(&self, request: &RedeemResetRequest) -> Result<(), AuthError>;

    async fn create_principal(&self, request: &NewPrincipalRequest)
    -> Result<Principal, AuthError>;

    /// Clears failures and any lock held against the principal.
    async fn unlock_principal(
        &self,
        kind: PrincipalKind,
        identifier: &str,
    ) -> Result<Principal, AuthError>;

    /// Clears failures and any lock held against a source address.
    async fn unlock_ip(&self, ip: IpAddr) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_aggregate() {
        let mut errors = FieldErrors::new();
        errors.add(fields::PASSWORD1, messages::WEAK_PASSWORD);
        errors.add(fields::PASSWORD2, messages::PASSWORD_MISMATCH);
        errors.add(fields::PASSWORD1, "second");

        assert_eq!(errors.get(fields::PASSWORD1).map(<[String]>::len), Some(2));
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["password1", "password2"]);

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["password2"][0], messages::PASSWORD_MISMATCH);

        assert!(FieldErrors::new().into_result().is_ok());
        assert!(matches!(errors.into_result(), Err(AuthError::Validation(_))));
    }

    #[test]
    fn test_denials_share_message() {
        assert_eq!(
            AuthError::Unauthorized(DenyReason::Locked).to_string(),
            AuthError::Unauthorized(DenyReason::BadCredentials).to_string()
        );
        assert_eq!(AuthError::InvalidKey.to_string(), "Bad application key");
        assert_eq!(AuthError::MissingKey.to_string(), "Missing application key");
    }

    #[test]
    fn test_is_invalid_code() {
        assert!(AuthError::InvalidCode.is_invalid_code());
        assert!(AuthError::Validation(FieldErrors::single(fields::CODE, messages::INVALID_CODE))
            .is_invalid_code());
        assert!(!AuthError::Validation(FieldErrors::single(fields::EMAIL, "x")).is_invalid_code());
    }
}
