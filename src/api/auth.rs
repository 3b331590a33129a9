use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, RequestContext};
use crate::constants::messages;
use crate::state::SharedState;

/// Rejects requests without an accepted application key. The matching
/// [`crate::models::AppKey`] is stored in the request extensions.
pub async fn app_key_middleware(
    State(state): State<Arc<SharedState>>,
    ctx: RequestContext,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let app_key = state.auth.gate(ctx.app_key.as_deref()).await?;
    request.extensions_mut().insert(app_key);
    Ok(next.run(request).await)
}

/// Runs the full credential verifier on the request's Basic credentials and
/// stores the resulting [`crate::services::Authorized`] in the request
/// extensions.
pub async fn credentials_middleware(
    State(state): State<Arc<SharedState>>,
    ctx: RequestContext,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(login) = ctx.login_request() else {
        state.auth.gate(ctx.app_key.as_deref()).await?;
        return Err(ApiError::Unauthorized(messages::BAD_CREDENTIALS.to_string()));
    };

    let authorized = state.auth.authenticate(&login).await?;
    tracing::debug!(principal_id = authorized.principal.id, "Request authenticated");

    request.extensions_mut().insert(authorized);
    Ok(next.run(request).await)
}
