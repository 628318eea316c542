//! Seeds operator logins into the identity service.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{info, warn};
use ts_rs::TS;

use super::{
    config::OperatorAccount,
    identity_admin::{IdentityAdmin, IdentityAdminError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SetupAction {
    Created,
    Updated,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AccountSetupResult {
    pub email: String,
    pub action: SetupAction,
    pub error: Option<String>,
}

async fn setup_one(
    identity: &dyn IdentityAdmin,
    account: &OperatorAccount,
) -> Result<SetupAction, IdentityAdminError> {
    match identity
        .create_user(&account.email, &account.password, &account.display_name)
        .await
    {
        Ok(_) => Ok(SetupAction::Created),
        Err(IdentityAdminError::AlreadyRegistered) => {
            let user = identity.find_user_by_email(&account.email).await?;
            identity
                .update_user(user.id, &account.password, &account.display_name)
                .await?;
            Ok(SetupAction::Updated)
        }
        Err(err) => Err(err),
    }
}

/// Create each account, or refresh its password and display name when it
/// already exists. One failing account does not stop the rest.
pub async fn setup_operator_accounts(
    identity: &dyn IdentityAdmin,
    accounts: &[OperatorAccount],
) -> Vec<AccountSetupResult> {
    let mut results = Vec::with_capacity(accounts.len());
    for account in accounts {
        let result = match setup_one(identity, account).await {
            Ok(action) => {
                info!(email = %account.email, %action, "operator account ready");
                AccountSetupResult {
                    email: account.email.clone(),
                    action,
                    error: None,
                }
            }
            Err(err) => {
                warn!(email = %account.email, error = %err, "operator account setup failed");
                AccountSetupResult {
                    email: account.email.clone(),
                    action: SetupAction::Failed,
                    error: Some(err.to_string()),
                }
            }
        };
        results.push(result);
    }
    results
}
