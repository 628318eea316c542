use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use deployment::Deployment;
use secrecy::ExposeSecret;
use serde::Deserialize;
use services::services::user_setup::{AccountSetupResult, setup_operator_accounts};
use tracing::{info, warn};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::Json,
    middleware::auth::{ADMIN_COOKIE, constant_time_eq},
};

#[derive(Debug, Deserialize, TS)]
pub struct AdminLogin {
    pub password: Option<String>,
}

fn admin_cookie(value: &'static str) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

pub async fn admin_login(
    State(deployment): State<DeploymentImpl>,
    jar: CookieJar,
    Json(payload): Json<AdminLogin>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<()>>), ApiError> {
    let Some(expected) = deployment.config().admin_password.as_ref() else {
        return Err(ApiError::Unavailable("admin password is not configured".into()));
    };
    let matches = payload
        .password
        .as_deref()
        .is_some_and(|given| constant_time_eq(given, expected.expose_secret()));
    if !matches {
        warn!("admin login rejected");
        return Err(ApiError::Unauthorized("invalid password".into()));
    }

    info!("admin logged in");
    Ok((
        jar.add(admin_cookie("true")),
        ResponseJson(ApiResponse::success_with_message((), "Logged in")),
    ))
}

pub async fn admin_logout(jar: CookieJar) -> (CookieJar, ResponseJson<ApiResponse<()>>) {
    (
        jar.remove(admin_cookie("")),
        ResponseJson(ApiResponse::success_with_message((), "Logged out")),
    )
}

pub async fn setup_users(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<AccountSetupResult>>>, ApiError> {
    let identity = deployment
        .identity_admin()
        .ok_or_else(|| ApiError::Unavailable("identity service is not configured".into()))?;
    let results =
        setup_operator_accounts(identity.as_ref(), &deployment.config().operator_accounts).await;
    Ok(ResponseJson(ApiResponse::success(results)))
}

pub fn public_router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/admin-login", post(admin_login))
        .route("/auth/admin-logout", post(admin_logout))
}

pub fn worker_router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/auth/setup-users", post(setup_users))
}
