//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ResetConfig;
use crate::constants::{fields, messages, templates};
use crate::db::{NewPrincipal, Store};
use crate::models::{AppKey, Principal, PrincipalKind, normalize_identifier};
use crate::services::app_key_gate::AppKeyGate;
use crate::services::auth_service::{
    AuthError, AuthService, Authorized, ChangePasswordRequest, DenyReason, FieldErrors,
    LoginRequest, NewPrincipalRequest, RedeemResetRequest, ResetRequested,
};
use crate::services::hasher::HashPool;
use crate::services::lockout::{LockoutTracker, SubjectKey, saturating_secs};
use crate::services::notify::{Notification, Notifier};
use crate::services::password_policy::{
    PolicyError, validate_complexity, validate_confirmation, validate_reuse,
};

/// Random alphanumeric reset code drawn from the thread-local CSPRNG.
#[must_use]
pub fn generate_reset_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn codes_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

fn record_denial(kind: PrincipalKind, reason: DenyReason) {
    metrics::counter!(
        "gatekeeper_auth_failures_total",
        "namespace" => kind.as_str(),
        "outcome" => reason.as_str()
    )
    .increment(1);
}

fn policy_error(errors: &mut FieldErrors, field: &str, err: PolicyError) -> Result<(), AuthError> {
    match err {
        PolicyError::Store(e) => Err(AuthError::Internal(e.to_string())),
        other => {
            errors.add(field, other.to_string());
            Ok(())
        }
    }
}

pub struct SeaOrmAuthService {
    store: Store,
    gate: AppKeyGate,
    tracker: Arc<dyn LockoutTracker>,
    hashes: HashPool,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    reset: ResetConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        tracker: Arc<dyn LockoutTracker>,
        hashes: HashPool,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        reset: ResetConfig,
    ) -> Self {
        Self {
            gate: AppKeyGate::new(store.clone()),
            store,
            tracker,
            hashes,
            notifier,
            clock,
            reset,
        }
    }

    /// Enabled user looked up by email; anything else counts as absent.
    async fn reset_target(&self, email: &str) -> Result<Option<Principal>, AuthError> {
        let principal = self
            .store
            .find_principal_by_email(PrincipalKind::User, email)
            .await?;
        Ok(principal.filter(|p| p.status.can_authenticate()))
    }

    async fn deny_unknown(&self, request: &LoginRequest) -> Result<Authorized, AuthError> {
        self.hashes.verify_dummy(&request.password).await?;
        record_denial(request.kind, DenyReason::BadCredentials);
        info!(namespace = %request.kind, "Login rejected: unknown or inactive principal");
        Err(AuthError::Unauthorized(DenyReason::BadCredentials))
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn gate(&self, app_key: Option<&str>) -> Result<AppKey, AuthError> {
        self.gate.check(app_key).await
    }

    async fn authenticate(&self, request: &LoginRequest) -> Result<Authorized, AuthError> {
        self.gate.check(request.app_key.as_deref()).await?;
        let now = self.clock.now();

        let Some((principal, password_hash)) = self
            .store
            .find_principal(request.kind, &request.identifier)
            .await?
        else {
            return self.deny_unknown(request).await;
        };
        if !principal.status.can_authenticate() {
            return self.deny_unknown(request).await;
        }

        let policy = self.store.resolve_policy(principal.id).await?;
        let subject = SubjectKey::for_policy(&policy, principal.kind, principal.id, request.ip);

        let state = self.tracker.lock_state(&subject, &policy, now).await?;
        if state.locked {
            record_denial(principal.kind, DenyReason::Locked);
            info!(
                principal_id = principal.id,
                subject = %subject,
                remaining_secs = state.remaining.map_or(0, |d| d.as_secs()),
                "Login rejected: subject locked"
            );
            return Err(AuthError::Unauthorized(DenyReason::Locked));
        }

        if !self.hashes.verify(&request.password, &password_hash).await? {
            let after = self.tracker.record_failure(&subject, &policy, now).await?;
            record_denial(principal.kind, DenyReason::BadCredentials);
            if after.locked {
                metrics::counter!(
                    "gatekeeper_lockouts_total",
                    "namespace" => principal.kind.as_str()
                )
                .increment(1);
            }
            info!(
                principal_id = principal.id,
                subject = %subject,
                failures = after.failures,
                locked = after.locked,
                "Login rejected: wrong password"
            );
            return Err(AuthError::Unauthorized(DenyReason::BadCredentials));
        }

        self.tracker.reset(&subject).await?;

        let password_expired = policy.password_expired(principal.password_changed_at, now.timestamp());
        debug!(principal_id = principal.id, password_expired, "Login accepted");

        Ok(Authorized {
            principal,
            password_expired,
        })
    }

    async fn change_password(
        &self,
        principal_id: i32,
        request: &ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let (principal, password_hash) = self
            .store
            .get_principal_with_password(principal_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("Principal {principal_id}")))?;

        let mut errors = FieldErrors::new();

        let complex = match validate_complexity(&request.password1) {
            Ok(()) => true,
            Err(e) => {
                policy_error(&mut errors, fields::PASSWORD1, e)?;
                false
            }
        };

        if let Err(e) = validate_confirmation(&request.password1, &request.password2) {
            policy_error(&mut errors, fields::PASSWORD2, e)?;
        }

        let previous_ok = self
            .hashes
            .verify(&request.previous_password, &password_hash)
            .await?;
        if !previous_ok {
            errors.add(fields::PREVIOUS_PASSWORD, messages::WRONG_PASSWORD);
        }

        // reuse is only checked for a change that would otherwise succeed
        if complex && previous_ok {
            let policy = self.store.resolve_policy(principal.id).await?;
            if let Err(e) =
                validate_reuse(&self.store, &self.hashes, principal.id, &request.password1, &policy).await
            {
                policy_error(&mut errors, fields::PASSWORD1, e)?;
            }
        }

        errors.into_result()?;

        let hash = self.hashes.hash(&request.password1).await?;
        self.store
            .update_principal_password(principal.id, &hash, self.clock.unix(), true)
            .await?;

        info!(principal_id = principal.id, "Password changed");
        Ok(())
    }

    async fn request_password_reset(
        &self,
        email: &str,
        ip: Option<IpAddr>,
    ) -> Result<ResetRequested, AuthError> {
        let Some(principal) = self.reset_target(email).await? else {
            debug!("Password reset requested for unknown email");
            if self.reset.conceal_unknown_email {
                return Ok(ResetRequested { sent: false });
            }
            return Err(AuthError::Validation(FieldErrors::single(
                fields::EMAIL,
                messages::EMAIL_NOT_FOUND,
            )));
        };

        let code = generate_reset_code(self.reset.code_length);
        let ip = ip.map(|ip| ip.to_string());
        self.store
            .issue_reset_code(principal.id, &code, self.clock.unix(), ip.as_deref())
            .await?;

        let notification =
            Notification::email(&principal, templates::PASSWORD_RESET_CODE).var("code", code);
        let sent = self.notifier.send(&notification).await?;

        metrics::counter!("gatekeeper_password_resets_total", "outcome" => "issued").increment(1);
        if sent {
            info!(principal_id = principal.id, "Password reset code issued");
        } else {
            warn!(principal_id = principal.id, "Password reset code issued but not delivered");
        }

        Ok(ResetRequested { sent })
    }

    async fn redeem_password_reset(&self, request: &RedeemResetRequest) -> Result<(), AuthError> {
        let now = self.clock.unix();
        let ttl = saturating_secs(self.reset.code_ttl_seconds);
        let mut errors = FieldErrors::new();

        let principal = self.reset_target(&request.email).await?;
        let mut code = None;

        match &principal {
            None => errors.add(fields::EMAIL, messages::EMAIL_NOT_FOUND),
            Some(principal) => {
                code = self
                    .store
                    .latest_reset_code(principal.id)
                    .await?
                    .filter(|c| codes_match(&c.code, request.code.trim()))
                    .filter(|c| c.issued_at.saturating_add(ttl) >= now);
                if code.is_none() {
                    errors.add(fields::CODE, messages::INVALID_CODE);
                }
            }
        }

        let complex = match validate_complexity(&request.password1) {
            Ok(()) => true,
            Err(e) => {
                policy_error(&mut errors, fields::PASSWORD1, e)?;
                false
            }
        };

        if let Err(e) = validate_confirmation(&request.password1, &request.password2) {
            policy_error(&mut errors, fields::PASSWORD2, e)?;
        }

        let reuse_target = principal.as_ref().filter(|_| code.is_some() && complex);
        if let Some(principal) = reuse_target.filter(|_| self.reset.enforce_reuse_on_reset) {
            let policy = self.store.resolve_policy(principal.id).await?;
            if let Err(e) =
                validate_reuse(&self.store, &self.hashes, principal.id, &request.password1, &policy).await
            {
                policy_error(&mut errors, fields::PASSWORD1, e)?;
            }
        }

        errors.into_result()?;

        let (Some(principal), Some(code)) = (principal, code) else {
            return Err(AuthError::InvalidCode);
        };

        let hash = self.hashes.hash(&request.password1).await?;
        let redeemed = self
            .store
            .redeem_reset_code(
                code.id,
                principal.id,
                &hash,
                now,
                self.reset.record_history_on_reset,
            )
            .await?;

        if !redeemed {
            metrics::counter!("gatekeeper_password_resets_total", "outcome" => "raced").increment(1);
            info!(principal_id = principal.id, "Reset code already consumed");
            return Err(AuthError::InvalidCode);
        }

        metrics::counter!("gatekeeper_password_resets_total", "outcome" => "redeemed").increment(1);
        info!(principal_id = principal.id, "Password reset redeemed");
        Ok(())
    }

    async fn create_principal(
        &self,
        request: &NewPrincipalRequest,
    ) -> Result<Principal, AuthError> {
        let mut errors = FieldErrors::new();
        let username = normalize_identifier(&request.username);
        let email = normalize_identifier(&request.email);

        if username.is_empty() {
            errors.add(fields::USERNAME, messages::REQUIRED);
        } else if self.store.find_principal(request.kind, &username).await?.is_some() {
            errors.add(fields::USERNAME, messages::USERNAME_TAKEN);
        }

        if email.is_empty() {
            errors.add(fields::EMAIL, messages::REQUIRED);
        } else if self.store.find_principal(request.kind, &email).await?.is_some() {
            // checked against usernames too, so an identifier never names two principals
            errors.add(fields::EMAIL, messages::EMAIL_TAKEN);
        }

        if let Err(e) = validate_complexity(&request.password) {
            policy_error(&mut errors, fields::PASSWORD1, e)?;
        }

        let role_names: Vec<&str> = if request.roles.is_empty() {
            vec![default_role(request.kind)]
        } else {
            request.roles.iter().map(String::as_str).collect()
        };

        let mut role_ids = Vec::with_capacity(role_names.len());
        for name in role_names {
            match self.store.get_role_by_name(name).await? {
                Some(role) => role_ids.push(role.id),
                None => errors.add(fields::ROLES, format!("{}: {name}", messages::UNKNOWN_ROLE)),
            }
        }

        errors.into_result()?;

        let password_hash = self.hashes.hash(&request.password).await?;
        let principal = self
            .store
            .create_principal(
                NewPrincipal {
                    kind: request.kind,
                    username,
                    email,
                    password_hash,
                    status: request.status,
                    role_ids,
                },
                self.clock.unix(),
            )
            .await?;

        info!(
            principal_id = principal.id,
            namespace = %principal.kind,
            "Principal created"
        );
        Ok(principal)
    }

    async fn unlock_principal(
        &self,
        kind: PrincipalKind,
        identifier: &str,
    ) -> Result<Principal, AuthError> {
        let (principal, _) = self
            .store
            .find_principal(kind, identifier)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("{kind} '{identifier}'")))?;

        self.tracker
            .reset(&SubjectKey::Principal {
                kind,
                id: principal.id,
            })
            .await?;

        info!(principal_id = principal.id, "Lockout cleared");
        Ok(principal)
    }

    async fn unlock_ip(&self, ip: IpAddr) -> Result<(), AuthError> {
        self.tracker.reset(&SubjectKey::Ip(ip)).await?;
        info!(ip = %ip, "Lockout cleared");
        Ok(())
    }
}

const fn default_role(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::Admin => "administrator",
        PrincipalKind::User => "user",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_code_shape() {
        let code = generate_reset_code(12);
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, generate_reset_code(12));
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("AbC123", "AbC123"));
        assert!(!codes_match("AbC123", "abc123"));
        assert!(!codes_match("AbC123", "AbC12"));
    }
}
