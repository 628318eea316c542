//! Admin cookie and worker bearer checks.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use deployment::Deployment;
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{DeploymentImpl, error::ApiError};

pub const ADMIN_COOKIE: &str = "admin-auth";

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Admin routes need `admin-auth=true` unless the check is switched off.
pub async fn require_admin(
    State(deployment): State<DeploymentImpl>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if deployment.config().admin_auth_required
        && !jar.get(ADMIN_COOKIE).is_some_and(|c| c.value() == "true")
    {
        return Err(ApiError::Unauthorized("admin login required".into()));
    }
    Ok(next.run(request).await)
}

/// Machine-to-machine routes need `Authorization: Bearer <WORKER_SECRET>`.
pub async fn require_worker_secret(
    State(deployment): State<DeploymentImpl>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(secret) = deployment.config().worker_secret.as_ref() else {
        warn!(path = %request.uri().path(), "WORKER_SECRET not configured; rejecting worker call");
        return Err(ApiError::Unauthorized("worker secret is not configured".into()));
    };
    let authorized = bearer_token(request.headers())
        .is_some_and(|token| constant_time_eq(token, secret.expose_secret()));
    if !authorized {
        return Err(ApiError::Unauthorized("invalid or missing bearer token".into()));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer_token(&headers), Some("s3cret"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn secret_comparison() {
        assert!(constant_time_eq("s3cret", "s3cret"));
        assert!(!constant_time_eq("s3cret", "s3cre"));
        assert!(!constant_time_eq("", "s3cret"));
    }
}
