mod common;

use common::{harness, harness_with, strict_policy};
use gatekeeper::config::LockoutBackend;
use gatekeeper::constants::{fields, messages};
use gatekeeper::services::{AuthError, RedeemResetRequest};
use std::sync::Arc;

const PASSWORD: &str = "Correct1horse";

fn redeem(email: &str, code: &str, password: &str) -> RedeemResetRequest {
    RedeemResetRequest {
        email: email.to_string(),
        code: code.to_string(),
        password1: password.to_string(),
        password2: password.to_string(),
    }
}

#[tokio::test]
async fn test_code_is_single_use() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("ada", PASSWORD, "user").await;

    let requested = h
        .state
        .auth
        .request_password_reset("ada@example.com", None)
        .await
        .unwrap();
    assert!(requested.sent);
    let code = h.notifier.last_code();
    assert_eq!(code.len(), 12);

    h.state
        .auth
        .redeem_password_reset(&redeem("ada@example.com", &code, "Fresh1start"))
        .await
        .unwrap();
    assert!(h.state.auth.authenticate(&h.login("ada", "Fresh1start")).await.is_ok());
    assert!(h.state.auth.authenticate(&h.login("ada", PASSWORD)).await.is_err());

    let again = h
        .state
        .auth
        .redeem_password_reset(&redeem("ada@example.com", &code, "Another2go"))
        .await
        .unwrap_err();
    assert!(again.is_invalid_code());
}

#[tokio::test]
async fn test_code_expires_after_ttl() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("bo", PASSWORD, "user").await;
    h.user("cy", PASSWORD, "user").await;

    h.state.auth.request_password_reset("bo@example.com", None).await.unwrap();
    let bo_code = h.notifier.last_code();
    h.state.auth.request_password_reset("cy@example.com", None).await.unwrap();
    let cy_code = h.notifier.last_code();

    h.clock.advance_secs(3600);
    h.state
        .auth
        .redeem_password_reset(&redeem("bo@example.com", &bo_code, "Fresh1start"))
        .await
        .unwrap();

    h.clock.advance_secs(1);
    let err = h
        .state
        .auth
        .redeem_password_reset(&redeem("cy@example.com", &cy_code, "Fresh1start"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_code());
}

#[tokio::test]
async fn test_newer_code_shadows_older() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("dee", PASSWORD, "user").await;

    h.state.auth.request_password_reset("dee@example.com", None).await.unwrap();
    let first = h.notifier.last_code();
    h.state.auth.request_password_reset("dee@example.com", None).await.unwrap();
    let second = h.notifier.last_code();
    assert_ne!(first, second);

    let err = h
        .state
        .auth
        .redeem_password_reset(&redeem("dee@example.com", &first, "Fresh1start"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_code());

    h.state
        .auth
        .redeem_password_reset(&redeem("DEE@example.com", &second, "Fresh1start"))
        .await
        .unwrap();

    // the older code stays dead after the newer one is used
    let err = h
        .state
        .auth
        .redeem_password_reset(&redeem("dee@example.com", &first, "Stale9code"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_code());
    assert!(h.state.auth.authenticate(&h.login("dee", "Stale9code")).await.is_err());
    assert!(h.state.auth.authenticate(&h.login("dee", "Fresh1start")).await.is_ok());
}

#[tokio::test]
async fn test_unknown_email() {
    let h = harness(LockoutBackend::Memory).await;

    let err = h
        .state
        .auth
        .request_password_reset("ghost@example.com", None)
        .await
        .unwrap_err();
    let AuthError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(
        errors.get(fields::EMAIL),
        Some(&[messages::EMAIL_NOT_FOUND.to_string()][..])
    );
    assert_eq!(h.notifier.count(), 0);

    let concealed = harness_with(LockoutBackend::Memory, |config| {
        config.reset.conceal_unknown_email = true;
    })
    .await;
    let requested = concealed
        .state
        .auth
        .request_password_reset("ghost@example.com", None)
        .await
        .unwrap();
    assert!(!requested.sent);
    assert_eq!(concealed.notifier.count(), 0);
}

#[tokio::test]
async fn test_redeem_aggregates_errors() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("eve", PASSWORD, "user").await;
    h.state.auth.request_password_reset("eve@example.com", None).await.unwrap();

    let err = h
        .state
        .auth
        .redeem_password_reset(&RedeemResetRequest {
            email: "eve@example.com".to_string(),
            code: "WRONGCODE000".to_string(),
            password1: "weakling".to_string(),
            password2: "weakling!".to_string(),
        })
        .await
        .unwrap_err();

    let AuthError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let mut reported: Vec<&str> = errors.fields().collect();
    reported.sort_unstable();
    assert_eq!(reported, vec![fields::CODE, fields::PASSWORD1, fields::PASSWORD2]);

    // a failed attempt leaves the code usable
    let code = h.notifier.last_code();
    h.state
        .auth
        .redeem_password_reset(&redeem("eve@example.com", &code, "Fresh1start"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_history_on_reset_is_configurable() {
    let plain = harness(LockoutBackend::Memory).await;
    plain.role("strict", strict_policy()).await;
    let principal = plain.user("fay", PASSWORD, "strict").await;

    plain.state.auth.request_password_reset("fay@example.com", None).await.unwrap();
    let code = plain.notifier.last_code();
    plain
        .state
        .auth
        .redeem_password_reset(&redeem("fay@example.com", &code, "Fresh1start"))
        .await
        .unwrap();
    let history = plain.state.store.recent_password_hashes(principal.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);

    let recording = harness_with(LockoutBackend::Memory, |config| {
        config.reset.record_history_on_reset = true;
        config.reset.enforce_reuse_on_reset = true;
    })
    .await;
    recording.role("strict", strict_policy()).await;
    let principal = recording.user("fay", PASSWORD, "strict").await;

    recording.state.auth.request_password_reset("fay@example.com", None).await.unwrap();
    let code = recording.notifier.last_code();
    let err = recording
        .state
        .auth
        .redeem_password_reset(&redeem("fay@example.com", &code, PASSWORD))
        .await
        .unwrap_err();
    let AuthError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(
        errors.get(fields::PASSWORD1),
        Some(&[messages::PASSWORD_REUSED.to_string()][..])
    );

    recording
        .state
        .auth
        .redeem_password_reset(&redeem("fay@example.com", &code, "Fresh1start"))
        .await
        .unwrap();
    let history = recording.state.store.recent_password_hashes(principal.id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_concurrent_redeem_has_one_winner() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("gus", PASSWORD, "user").await;
    h.state.auth.request_password_reset("gus@example.com", None).await.unwrap();
    let code = h.notifier.last_code();

    let auth = Arc::clone(&h.state.auth);
    let mut tasks = Vec::new();
    for password in ["Fresh1start", "Other2start"] {
        let auth = Arc::clone(&auth);
        let request = redeem("gus@example.com", &code, password);
        tasks.push(tokio::spawn(async move {
            auth.redeem_password_reset(&request).await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => winners += 1,
            Err(e) => assert!(e.is_invalid_code(), "unexpected error: {e:?}"),
        }
    }
    assert_eq!(winners, 1);
}
