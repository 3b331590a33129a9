mod common;

use axum::{
    Extension, Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{harness, strict_policy};
use gatekeeper::api::{ApiResponse, app_key_middleware, credentials_middleware};
use gatekeeper::config::LockoutBackend;
use gatekeeper::constants::APP_KEY_HEADER;
use gatekeeper::models::{AccountStatus, AppKey, PrincipalKind};
use gatekeeper::services::{Authorized, NewPrincipalRequest};
use gatekeeper::SharedState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "Correct1horse";

async fn whoami(Extension(authorized): Extension<Authorized>) -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(authorized.principal.username))
}

async fn application(Extension(key): Extension<AppKey>) -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(key.application))
}

fn app(state: SharedState) -> Router {
    let state = Arc::new(state);

    let authenticated = Router::new()
        .route("/me", get(whoami))
        .route("/admin/me", get(whoami))
        .route_layer(from_fn_with_state(state.clone(), credentials_middleware));

    let keyed = Router::new()
        .route("/application", get(application))
        .route_layer(from_fn_with_state(state, app_key_middleware));

    authenticated.merge(keyed)
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn get_request(uri: &str, app_key: Option<&str>, credentials: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = app_key {
        builder = builder.header(APP_KEY_HEADER, key);
    }
    if let Some((username, password)) = credentials {
        builder = builder.header(header::AUTHORIZATION, basic(username, password));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_app_key_is_required() {
    let h = harness(LockoutBackend::Memory).await;
    let app = app(h.state.clone());

    let (status, body) = send(&app, get_request("/application", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing application key");

    let (status, body) = send(&app, get_request("/application", Some("bogus"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Bad application key");

    let (status, body) = send(&app, get_request("/application", Some(&h.app_key), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "test-suite");
}

#[tokio::test]
async fn test_basic_credentials_authenticate() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("ana", PASSWORD, "user").await;
    let app = app(h.state.clone());

    let (status, body) = send(
        &app,
        get_request("/me", Some(&h.app_key), Some(("ana", PASSWORD))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "ana");

    let (status, body) = send(&app, get_request("/me", Some(&h.app_key), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Bad credentials");

    // the key is checked even when there is nothing else to check
    let (_, body) = send(&app, get_request("/me", None, None)).await;
    assert_eq!(body["error"], "Missing application key");
}

#[tokio::test]
async fn test_locked_and_wrong_password_look_the_same() {
    let h = harness(LockoutBackend::Database).await;
    h.role("strict", strict_policy()).await;
    h.user("ben", PASSWORD, "strict").await;
    h.user("cal", PASSWORD, "strict").await;
    let app = app(h.state.clone());

    for _ in 0..3 {
        send(&app, get_request("/me", Some(&h.app_key), Some(("ben", "Nope1nope")))).await;
    }

    let locked = send(
        &app,
        get_request("/me", Some(&h.app_key), Some(("ben", PASSWORD))),
    )
    .await;
    let wrong = send(
        &app,
        get_request("/me", Some(&h.app_key), Some(("cal", "Nope1nope"))),
    )
    .await;
    let unknown = send(
        &app,
        get_request("/me", Some(&h.app_key), Some(("dot", PASSWORD))),
    )
    .await;

    assert_eq!(locked.0, StatusCode::UNAUTHORIZED);
    assert_eq!(locked, wrong);
    assert_eq!(locked, unknown);
}

#[tokio::test]
async fn test_admin_paths_use_admin_namespace() {
    let h = harness(LockoutBackend::Memory).await;
    h.user("eli", PASSWORD, "user").await;
    h.state
        .auth
        .create_principal(&NewPrincipalRequest {
            kind: PrincipalKind::Admin,
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            password: PASSWORD.to_string(),
            status: AccountStatus::Enabled,
            roles: Vec::new(),
        })
        .await
        .unwrap();
    let app = app(h.state.clone());

    let (status, body) = send(
        &app,
        get_request("/admin/me", Some(&h.app_key), Some(("root", PASSWORD))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "root");

    let (status, _) = send(
        &app,
        get_request("/admin/me", Some(&h.app_key), Some(("eli", PASSWORD))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        get_request("/me", Some(&h.app_key), Some(("root", PASSWORD))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
