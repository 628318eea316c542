use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use deployment::Deployment;
use services::services::email_worker::{self, BatchSettings, EmailWorkerReport};
use std::time::Duration;
use tracing::info;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// Drain one batch of the email outbox. Called by an external scheduler.
pub async fn run_email_worker(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<EmailWorkerReport>>, ApiError> {
    let mailer = deployment
        .mailer()
        .ok_or_else(|| ApiError::Unavailable("mail API key is not configured".into()))?;
    let mail = &deployment.config().mail;
    let settings = BatchSettings {
        batch_size: mail.batch_size,
        send_delay: Duration::from_millis(mail.send_delay_ms),
    };

    let report = email_worker::run_batch(&deployment.db().pool, mailer.as_ref(), settings).await?;
    info!(
        processed = report.processed,
        sent = report.sent,
        failed = report.failed,
        "email worker batch finished"
    );
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/email-worker", post(run_email_worker))
}
