use axum::extract::{ConnectInfo, FromRequestParts, OriginalUri};
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::constants::APP_KEY_HEADER;
use crate::models::PrincipalKind;
use crate::services::LoginRequest;

/// Credentials from an `Authorization: Basic ...` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the security services need from an inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub app_key: Option<String>,
    pub credentials: Option<BasicCredentials>,
    pub ip: Option<IpAddr>,
    /// `/admin/...` paths address administrators, everything else users.
    pub kind: PrincipalKind,
}

impl RequestContext {
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.0.path());

        Self {
            app_key: header_str(&parts.headers, APP_KEY_HEADER).map(str::to_string),
            credentials: header_str(&parts.headers, header::AUTHORIZATION.as_str())
                .and_then(BasicCredentials::from_header),
            ip: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip()),
            kind: kind_for_path(path),
        }
    }

    /// Login request for the supplied Basic credentials, if any.
    #[must_use]
    pub fn login_request(&self) -> Option<LoginRequest> {
        let credentials = self.credentials.as_ref()?;
        Some(LoginRequest {
            app_key: self.app_key.clone(),
            kind: self.kind,
            identifier: credentials.username.clone(),
            password: credentials.password.clone(),
            ip: self.ip,
        })
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn kind_for_path(path: &str) -> PrincipalKind {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    if first == "admin" {
        PrincipalKind::Admin
    } else {
        PrincipalKind::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn test_basic_credentials() {
        let encoded = STANDARD.encode("alice@example.com:pa:ss");
        let creds = BasicCredentials::from_header(&format!("Basic {encoded}")).unwrap();
        assert_eq!(creds.username, "alice@example.com");
        assert_eq!(creds.password, "pa:ss");

        assert!(BasicCredentials::from_header("Bearer abc").is_none());
        assert!(BasicCredentials::from_header("Basic !!!").is_none());
        assert!(!format!("{creds:?}").contains("pa:ss"));
    }

    #[test]
    fn test_context_from_parts() {
        let encoded = STANDARD.encode("root:Secret1!");
        let mut req = Request::builder()
            .uri("/admin/principals")
            .header(APP_KEY_HEADER, "k1")
            .header("Authorization", format!("Basic {encoded}"))
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("203.0.113.9:5000".parse().unwrap()));

        let ctx = RequestContext::from_parts(&parts(req));
        assert_eq!(ctx.kind, PrincipalKind::Admin);
        assert_eq!(ctx.app_key.as_deref(), Some("k1"));
        assert_eq!(ctx.ip, Some("203.0.113.9".parse().unwrap()));

        let login = ctx.login_request().unwrap();
        assert_eq!(login.identifier, "root");
        assert_eq!(login.kind, PrincipalKind::Admin);
    }

    #[test]
    fn test_user_namespace_by_default() {
        assert_eq!(kind_for_path("/me/password"), PrincipalKind::User);
        assert_eq!(kind_for_path("/administrators"), PrincipalKind::User);
        assert_eq!(kind_for_path("/admin"), PrincipalKind::Admin);

        let ctx = RequestContext::from_parts(&parts(Request::builder().uri("/").body(()).unwrap()));
        assert!(ctx.app_key.is_none());
        assert!(ctx.login_request().is_none());
    }
}
