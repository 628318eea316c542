use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use deployment::Deployment;
use tracing::warn;

use crate::{DeploymentImpl, error::ApiError};

/// First `x-forwarded-for` hop, then `x-real-ip`, then `"unknown"`.
pub fn client_key(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown")
        .to_string()
}

pub async fn limit_by_client(
    State(deployment): State<DeploymentImpl>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(request.headers());
    if !deployment.rate_limiter().check(&key).await {
        warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }
    Ok(next.run(request).await)
}
