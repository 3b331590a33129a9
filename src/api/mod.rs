//! axum adapter for the account security services. Routing is left to the
//! embedding application; this module supplies the extractor, middleware and
//! error mapping its handlers use.

use serde::Serialize;

pub mod auth;
pub mod context;
mod error;

pub use auth::{app_key_middleware, credentials_middleware};
pub use context::{BasicCredentials, RequestContext};
pub use error::ApiError;

use crate::services::FieldErrors;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            errors: None,
        }
    }

    pub fn field_errors(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self {
            errors: Some(errors),
            ..Self::error(message)
        }
    }
}
