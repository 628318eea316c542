//! Process configuration read from the environment at startup.

use std::{collections::HashSet, str::FromStr};

use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://printshop.db";
pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_MAIL_FROM: &str = "Print Shop <noreply@printshop.local>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("OPERATOR_ACCOUNTS entry '{0}' must look like email:password:display name")]
    OperatorAccount(String),
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: Option<SecretString>,
    pub from: String,
    pub admin_notification_email: Option<String>,
    pub batch_size: i64,
    pub send_delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub api_url: Option<String>,
    pub service_key: Option<SecretString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Login seeded into the identity service by `POST /auth/setup-users`.
#[derive(Debug, Clone)]
pub struct OperatorAccount {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_password: Option<SecretString>,
    pub admin_auth_required: bool,
    pub worker_secret: Option<SecretString>,
    pub mail: MailConfig,
    pub identity: IdentityConfig,
    pub operator_accounts: Vec<OperatorAccount>,
    pub rate_limit: RateLimitConfig,
    pub low_stock_threshold: i64,
    pub sentry_dsn: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            admin_password: None,
            admin_auth_required: true,
            worker_secret: None,
            mail: MailConfig {
                api_url: DEFAULT_MAIL_API_URL.to_string(),
                api_key: None,
                from: DEFAULT_MAIL_FROM.to_string(),
                admin_notification_email: None,
                batch_size: 10,
                send_delay_ms: 100,
            },
            identity: IdentityConfig {
                api_url: None,
                service_key: None,
            },
            operator_accounts: Vec::new(),
            rate_limit: RateLimitConfig {
                max_requests: 5,
                window_secs: 60,
            },
            low_stock_threshold: 500,
            sentry_dsn: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", "port number", defaults.port)?,
            admin_password: get("ADMIN_PASSWORD").map(SecretString::from),
            admin_auth_required: parse_bool(&get, "ADMIN_AUTH_REQUIRED", defaults.admin_auth_required)?,
            worker_secret: get("WORKER_SECRET").map(SecretString::from),
            mail: MailConfig {
                api_url: get("MAIL_API_URL").unwrap_or(defaults.mail.api_url),
                api_key: get("MAIL_API_KEY").map(SecretString::from),
                from: get("MAIL_FROM").unwrap_or(defaults.mail.from),
                admin_notification_email: get("ADMIN_NOTIFICATION_EMAIL"),
                batch_size: parse_or(&get, "EMAIL_BATCH_SIZE", "positive integer", defaults.mail.batch_size)
                    .and_then(|n| positive(n, "EMAIL_BATCH_SIZE"))?,
                send_delay_ms: parse_or(&get, "EMAIL_SEND_DELAY_MS", "number of milliseconds", defaults.mail.send_delay_ms)?,
            },
            identity: IdentityConfig {
                api_url: get("IDENTITY_API_URL"),
                service_key: get("IDENTITY_SERVICE_KEY").map(SecretString::from),
            },
            operator_accounts: match get("OPERATOR_ACCOUNTS") {
                Some(raw) => parse_operator_accounts(&raw)?,
                None => Vec::new(),
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_or(&get, "RATE_LIMIT_MAX_REQUESTS", "positive integer", defaults.rate_limit.max_requests)
                    .and_then(|n| positive(n, "RATE_LIMIT_MAX_REQUESTS"))?,
                window_secs: parse_or(&get, "RATE_LIMIT_WINDOW_SECS", "positive integer", defaults.rate_limit.window_secs)
                    .and_then(|n| positive(n, "RATE_LIMIT_WINDOW_SECS"))?,
            },
            low_stock_threshold: parse_or(&get, "LOW_STOCK_THRESHOLD", "integer", defaults.low_stock_threshold)?,
            sentry_dsn: get("SENTRY_DSN"),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(value) => Err(ConfigError::Invalid {
            name,
            expected: "boolean",
            value,
        }),
    }
}

fn positive<T>(value: T, name: &'static str) -> Result<T, ConfigError>
where
    T: PartialOrd + Default + ToString,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            expected: "positive integer",
            value: value.to_string(),
        })
    }
}

/// `email:password:display name` entries separated by `;`. The display name
/// may itself contain colons; only the first two separate fields.
pub fn parse_operator_accounts(raw: &str) -> Result<Vec<OperatorAccount>, ConfigError> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':').map(str::trim);
        let (Some(email), Some(password), Some(display_name)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ConfigError::OperatorAccount(redact(entry)));
        };
        if email.is_empty() || !email.contains('@') || password.is_empty() || display_name.is_empty() {
            return Err(ConfigError::OperatorAccount(redact(entry)));
        }
        if !seen.insert(email.to_lowercase()) {
            continue;
        }
        accounts.push(OperatorAccount {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
            display_name: display_name.to_string(),
        });
    }
    Ok(accounts)
}

// Error messages carry only the email part of an entry.
fn redact(entry: &str) -> String {
    entry.split(':').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.listen_addr(), "127.0.0.1:3001");
        assert!(config.admin_auth_required);
        assert_eq!(config.mail.batch_size, 10);
        assert_eq!(config.mail.send_delay_ms, 100);
        assert_eq!(config.rate_limit, RateLimitConfig { max_requests: 5, window_secs: 60 });
        assert_eq!(config.low_stock_threshold, 500);
        assert!(config.worker_secret.is_none());
    }

    #[test]
    fn values_are_read_and_validated() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("ADMIN_AUTH_REQUIRED", "off"),
            ("WORKER_SECRET", " s3cret "),
            ("EMAIL_BATCH_SIZE", "25"),
            ("ADMIN_NOTIFICATION_EMAIL", ""),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.admin_auth_required);
        assert_eq!(config.worker_secret.unwrap().expose_secret(), "s3cret");
        assert_eq!(config.mail.batch_size, 25);
        assert!(config.mail.admin_notification_email.is_none());

        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        let err = Config::from_lookup(lookup(&[("RATE_LIMIT_MAX_REQUESTS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RATE_LIMIT_MAX_REQUESTS", .. }));
        let err = Config::from_lookup(lookup(&[("ADMIN_AUTH_REQUIRED", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ADMIN_AUTH_REQUIRED", .. }));
    }

    #[test]
    fn operator_accounts_parse() {
        let accounts = parse_operator_accounts(
            "press1@shop.in:pw-one:Press One; press2@shop.in:pw:two:Press: Two ;press1@SHOP.in:x:Dup",
        )
        .unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].display_name, "Press One");
        assert_eq!(accounts[1].password.expose_secret(), "pw");
        assert_eq!(accounts[1].display_name, "two:Press: Two");

        let err = parse_operator_accounts("nobody:secret").unwrap_err();
        assert_eq!(err, ConfigError::OperatorAccount("nobody".into()));
    }
}
