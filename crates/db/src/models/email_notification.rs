use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const EMAIL_COLUMNS: &str =
    "id, recipient, subject, body, status, error_message, attempts, sent_at, created_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

/// Outbound email waiting for (or finished with) the email worker.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct EmailNotification {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub error_message: Option<String>,
    pub attempts: i64,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailNotification {
    pub async fn enqueue<'e, E>(
        executor: E,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO email_notifications (id, recipient, subject, body)
             VALUES ($1, $2, $3, $4)
             RETURNING {EMAIL_COLUMNS}"
        );
        sqlx::query_as::<_, EmailNotification>(&sql)
            .bind(Uuid::new_v4())
            .bind(recipient)
            .bind(subject)
            .bind(body)
            .fetch_one(executor)
            .await
    }

    /// Oldest pending emails first.
    pub async fn find_pending(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {EMAIL_COLUMNS} FROM email_notifications
             WHERE status = 'pending'
             ORDER BY created_at ASC
             LIMIT $1"
        );
        sqlx::query_as::<_, EmailNotification>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {EMAIL_COLUMNS} FROM email_notifications WHERE id = $1");
        sqlx::query_as::<_, EmailNotification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_sent(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE email_notifications
             SET status = 'sent',
                 attempts = attempts + 1,
                 error_message = NULL,
                 sent_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(pool: &SqlitePool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE email_notifications
             SET status = 'failed',
                 attempts = attempts + 1,
                 error_message = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }
}
