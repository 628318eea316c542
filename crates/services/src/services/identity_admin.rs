//! Admin client for the hosted identity service (GoTrue-style `/admin/users`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use super::config::IdentityConfig;

#[derive(Debug, Clone, Error)]
pub enum IdentityAdminError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("user is already registered")]
    AlreadyRegistered,
    #[error("no user with email {0}")]
    UserNotFound(String),
    #[error("identity service is not configured: set IDENTITY_API_URL and IDENTITY_SERVICE_KEY")]
    NotConfigured,
    #[error("invalid identity api url: {0}")]
    InvalidUrl(String),
    #[error("json error: {0}")]
    Serde(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    async fn create_user(&self, email: &str, password: &SecretString, display_name: &str)
    -> Result<IdentityUser, IdentityAdminError>;

    async fn find_user_by_email(&self, email: &str) -> Result<IdentityUser, IdentityAdminError>;

    async fn update_user(
        &self,
        id: Uuid,
        password: &SecretString,
        display_name: &str,
    ) -> Result<IdentityUser, IdentityAdminError>;
}

#[derive(Debug, Deserialize)]
struct UserList {
    users: Vec<IdentityUser>,
}

#[derive(Debug, Serialize)]
struct UserMetadata<'a> {
    display_name: &'a str,
    role: &'static str,
}

#[derive(Debug, Clone)]
pub struct HttpIdentityAdmin {
    http: Client,
    base: Url,
    service_key: SecretString,
}

impl HttpIdentityAdmin {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const PAGE_SIZE: u32 = 1000;

    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityAdminError> {
        match (&config.api_url, &config.service_key) {
            (Some(url), Some(key)) => Self::new(url, key.clone()),
            _ => Err(IdentityAdminError::NotConfigured),
        }
    }

    pub fn new(base_url: &str, service_key: SecretString) -> Result<Self, IdentityAdminError> {
        let mut base = Url::parse(base_url).map_err(|e| IdentityAdminError::InvalidUrl(e.to_string()))?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("printshop-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IdentityAdminError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base,
            service_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityAdminError> {
        self.base
            .join(path)
            .map_err(|e| IdentityAdminError::InvalidUrl(e.to_string()))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        request.bearer_auth(key).header("apikey", key)
    }

    async fn read_user(res: reqwest::Response) -> Result<IdentityUser, IdentityAdminError> {
        match res.status() {
            s if s.is_success() => res
                .json::<IdentityUser>()
                .await
                .map_err(|e| IdentityAdminError::Serde(e.to_string())),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                if is_already_registered(s, &body) {
                    Err(IdentityAdminError::AlreadyRegistered)
                } else {
                    Err(IdentityAdminError::Http { status, body })
                }
            }
        }
    }
}

/// The identity service reports duplicates with 422 and an
/// "already been registered" message.
fn is_already_registered(status: StatusCode, body: &str) -> bool {
    matches!(status, StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT | StatusCode::BAD_REQUEST)
        && body.to_lowercase().contains("already")
}

#[async_trait]
impl IdentityAdmin for HttpIdentityAdmin {
    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
        display_name: &str,
    ) -> Result<IdentityUser, IdentityAdminError> {
        let body = json!({
            "email": email,
            "password": password.expose_secret(),
            "email_confirm": true,
            "user_metadata": UserMetadata { display_name, role: "operator" },
        });
        let res = self
            .authorized(self.http.post(self.endpoint("admin/users")?))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_user(res).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<IdentityUser, IdentityAdminError> {
        let res = self
            .authorized(self.http.get(self.endpoint("admin/users")?))
            .query(&[("per_page", Self::PAGE_SIZE)])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(IdentityAdminError::Http { status, body });
        }
        let list = res
            .json::<UserList>()
            .await
            .map_err(|e| IdentityAdminError::Serde(e.to_string()))?;
        list.users
            .into_iter()
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .ok_or_else(|| IdentityAdminError::UserNotFound(email.to_string()))
    }

    async fn update_user(
        &self,
        id: Uuid,
        password: &SecretString,
        display_name: &str,
    ) -> Result<IdentityUser, IdentityAdminError> {
        let body = json!({
            "password": password.expose_secret(),
            "user_metadata": UserMetadata { display_name, role: "operator" },
        });
        let res = self
            .authorized(self.http.put(self.endpoint(&format!("admin/users/{id}"))?))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_user(res).await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> IdentityAdminError {
    if e.is_timeout() {
        IdentityAdminError::Timeout
    } else {
        IdentityAdminError::Transport(e.to_string())
    }
}
