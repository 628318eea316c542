use std::{path::Path, sync::Arc};

use db::DBService;
use services::services::{
    config::Config,
    database_validator::{DatabaseValidationError, DatabaseValidator},
    identity_admin::{HttpIdentityAdmin, IdentityAdmin, IdentityAdminError},
    mail_api::{HttpMailClient, MailApiError, MailSender},
    rate_limiter::RateLimiter,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Schema(#[from] DatabaseValidationError),
}

/// Everything a request handler can reach.
pub trait Deployment: Clone + Send + Sync + 'static {
    fn db(&self) -> &DBService;

    fn config(&self) -> &Config;

    fn rate_limiter(&self) -> &RateLimiter;

    /// `None` when no mail API key is configured.
    fn mailer(&self) -> Option<&Arc<dyn MailSender>>;

    /// `None` when the identity service is not configured.
    fn identity_admin(&self) -> Option<&Arc<dyn IdentityAdmin>>;
}

#[derive(Clone)]
pub struct PrintShopDeployment {
    db: DBService,
    config: Arc<Config>,
    rate_limiter: RateLimiter,
    mailer: Option<Arc<dyn MailSender>>,
    identity_admin: Option<Arc<dyn IdentityAdmin>>,
}

impl PrintShopDeployment {
    /// Open the configured database, run migrations, check the schema and
    /// build the outbound clients that have credentials.
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        Self::finish(db, config).await
    }

    /// Same as [`Self::new`] against a database file, used by tests.
    pub async fn new_at_path(path: &Path, config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new_at_path(path).await?;
        Self::finish(db, config).await
    }

    async fn finish(db: DBService, config: Config) -> Result<Self, DeploymentError> {
        DatabaseValidator::validate(&db.pool).await?;

        let mailer: Option<Arc<dyn MailSender>> = match HttpMailClient::from_config(&config.mail) {
            Ok(client) => Some(Arc::new(client)),
            Err(MailApiError::MissingApiKey) => {
                info!("MAIL_API_KEY not set; queued emails stay pending");
                None
            }
            Err(err) => {
                warn!(error = %err, "mail client disabled");
                None
            }
        };
        let identity_admin: Option<Arc<dyn IdentityAdmin>> =
            match HttpIdentityAdmin::from_config(&config.identity) {
                Ok(client) => Some(Arc::new(client)),
                Err(IdentityAdminError::NotConfigured) => None,
                Err(err) => {
                    warn!(error = %err, "identity admin client disabled");
                    None
                }
            };

        Ok(Self::from_parts(db, config, mailer, identity_admin))
    }

    pub fn from_parts(
        db: DBService,
        config: Config,
        mailer: Option<Arc<dyn MailSender>>,
        identity_admin: Option<Arc<dyn IdentityAdmin>>,
    ) -> Self {
        Self {
            db,
            rate_limiter: RateLimiter::new(config.rate_limit),
            config: Arc::new(config),
            mailer,
            identity_admin,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn MailSender>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_identity_admin(mut self, identity_admin: Arc<dyn IdentityAdmin>) -> Self {
        self.identity_admin = Some(identity_admin);
        self
    }
}

impl Deployment for PrintShopDeployment {
    fn db(&self) -> &DBService {
        &self.db
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn mailer(&self) -> Option<&Arc<dyn MailSender>> {
        self.mailer.as_ref()
    }

    fn identity_admin(&self) -> Option<&Arc<dyn IdentityAdmin>> {
        self.identity_admin.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clients_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let deployment = PrintShopDeployment::new_at_path(&dir.path().join("shop.db"), Config::default())
            .await
            .unwrap();
        assert!(deployment.mailer().is_none());
        assert!(deployment.identity_admin().is_none());
        assert_eq!(deployment.config().rate_limit.max_requests, 5);
    }
}
