//! Outbound mail over a Resend-compatible HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::config::MailConfig;

#[derive(Debug, Clone, Error)]
pub enum MailApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited by mail provider")]
    RateLimited,
    #[error("mail provider rejected the api key")]
    InvalidApiKey,
    #[error("missing api key: MAIL_API_KEY environment variable not set")]
    MissingApiKey,
    #[error("invalid mail api url: {0}")]
    InvalidUrl(String),
}

/// One message as handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailApiError>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpMailClient {
    http: Client,
    endpoint: Url,
    api_key: SecretString,
    from: String,
}

impl HttpMailClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn from_config(config: &MailConfig) -> Result<Self, MailApiError> {
        let api_key = config.api_key.clone().ok_or(MailApiError::MissingApiKey)?;
        Self::new(&config.api_url, api_key, config.from.clone())
    }

    pub fn new(endpoint: &str, api_key: SecretString, from: String) -> Result<Self, MailApiError> {
        let endpoint = Url::parse(endpoint).map_err(|e| MailApiError::InvalidUrl(e.to_string()))?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("printshop-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MailApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl MailSender for HttpMailClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailApiError> {
        let request = SendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.body,
        };
        let res = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MailApiError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(MailApiError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(MailApiError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> MailApiError {
    if e.is_timeout() {
        MailApiError::Timeout
    } else {
        MailApiError::Transport(e.to_string())
    }
}
