use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "id, machine_id, job_sheet_id, title, message, notification_type, is_read, created_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Info,
    JobAssigned,
    JobUpdated,
    JobCancelled,
}

/// Message shown on a machine operator's dashboard.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct OperatorNotification {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub job_sheet_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl OperatorNotification {
    pub async fn create<'e, E>(
        executor: E,
        machine_id: Uuid,
        job_sheet_id: Option<Uuid>,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO operator_notifications
                (id, machine_id, job_sheet_id, title, message, notification_type)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, OperatorNotification>(&sql)
            .bind(Uuid::new_v4())
            .bind(machine_id)
            .bind(job_sheet_id)
            .bind(title)
            .bind(message)
            .bind(notification_type)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_machine(
        pool: &SqlitePool,
        machine_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM operator_notifications
             WHERE machine_id = $1 AND ($2 = 0 OR is_read = 0)
             ORDER BY created_at DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, OperatorNotification>(&sql)
            .bind(machine_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn mark_read(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE operator_notifications SET is_read = 1 WHERE id = $1
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, OperatorNotification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Returns how many notifications flipped from unread to read.
    pub async fn mark_all_read(pool: &SqlitePool, machine_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operator_notifications SET is_read = 1 WHERE machine_id = $1 AND is_read = 0",
        )
        .bind(machine_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &SqlitePool, machine_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM operator_notifications WHERE machine_id = $1 AND is_read = 0",
        )
        .bind(machine_id)
        .fetch_one(pool)
        .await
    }
}
