//! Drains the `email_notifications` queue one batch per invocation.

use std::time::Duration;

use db::models::email_notification::EmailNotification;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

use super::mail_api::{MailSender, OutgoingEmail};

#[derive(Debug, Error)]
pub enum EmailWorkerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct EmailWorkerReport {
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub batch_size: i64,
    pub send_delay: Duration,
}

/// Send up to `batch_size` pending emails, oldest first. Each row ends up
/// `sent` or `failed`; nothing is retried within the run.
pub async fn run_batch(
    pool: &SqlitePool,
    mailer: &dyn MailSender,
    settings: BatchSettings,
) -> Result<EmailWorkerReport, EmailWorkerError> {
    let pending = EmailNotification::find_pending(pool, settings.batch_size).await?;
    let mut report = EmailWorkerReport::default();

    for (index, row) in pending.iter().enumerate() {
        if index > 0 && !settings.send_delay.is_zero() {
            tokio::time::sleep(settings.send_delay).await;
        }
        let email = OutgoingEmail {
            to: row.recipient.clone(),
            subject: row.subject.clone(),
            body: row.body.clone(),
        };
        report.processed += 1;
        match mailer.send(&email).await {
            Ok(()) => {
                EmailNotification::mark_sent(pool, row.id).await?;
                report.sent += 1;
            }
            Err(err) => {
                warn!(email_id = %row.id, recipient = %row.recipient, error = %err, "email send failed");
                EmailNotification::mark_failed(pool, row.id, &err.to_string()).await?;
                report.failed += 1;
            }
        }
    }

    if report.processed > 0 {
        info!(
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            "email batch finished"
        );
    }
    Ok(report)
}
