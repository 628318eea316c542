use db::models::{machine::Machine, operator_notification::OperatorNotification};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

const LIST_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("machine not found")]
    MachineNotFound,
    #[error("notification not found")]
    NotFound,
}

/// What the operator dashboard polls for.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NotificationFeed {
    pub notifications: Vec<OperatorNotification>,
    pub unread_count: i64,
}

pub struct NotificationService;

impl NotificationService {
    pub async fn list(
        pool: &SqlitePool,
        machine_id: Uuid,
        unread_only: bool,
    ) -> Result<NotificationFeed, NotificationError> {
        Machine::find_by_id(pool, machine_id)
            .await?
            .ok_or(NotificationError::MachineNotFound)?;
        let notifications =
            OperatorNotification::find_by_machine(pool, machine_id, unread_only, LIST_LIMIT).await?;
        let unread_count = OperatorNotification::unread_count(pool, machine_id).await?;
        Ok(NotificationFeed {
            notifications,
            unread_count,
        })
    }

    pub async fn mark_read(pool: &SqlitePool, id: Uuid) -> Result<OperatorNotification, NotificationError> {
        OperatorNotification::mark_read(pool, id)
            .await?
            .ok_or(NotificationError::NotFound)
    }

    /// Returns how many notifications flipped to read.
    pub async fn mark_all_read(pool: &SqlitePool, machine_id: Uuid) -> Result<u64, NotificationError> {
        let updated = OperatorNotification::mark_all_read(pool, machine_id).await?;
        debug!(machine_id = %machine_id, updated, "notifications marked read");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use db::models::{machine::CreateMachine, operator_notification::NotificationType};

    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn read_state_is_tracked_per_machine() {
        let (db, _dir) = test_db().await;
        let machine = Machine::create(&db.pool, Uuid::new_v4(), "Komori", 4, &CreateMachine::default())
            .await
            .unwrap();
        let first = OperatorNotification::create(&db.pool, machine.id, None, NotificationType::Info, "Shift", "Clean blankets")
            .await
            .unwrap();
        OperatorNotification::create(&db.pool, machine.id, None, NotificationType::Info, "Stock", "New paper arrived")
            .await
            .unwrap();

        let read = NotificationService::mark_read(&db.pool, first.id).await.unwrap();
        assert!(read.is_read);
        let feed = NotificationService::list(&db.pool, machine.id, true).await.unwrap();
        assert_eq!(feed.notifications.len(), 1);
        assert_eq!(feed.unread_count, 1);

        assert_eq!(NotificationService::mark_all_read(&db.pool, machine.id).await.unwrap(), 1);
        let feed = NotificationService::list(&db.pool, machine.id, false).await.unwrap();
        assert_eq!(feed.notifications.len(), 2);
        assert_eq!(feed.unread_count, 0);

        assert!(matches!(
            NotificationService::mark_read(&db.pool, Uuid::new_v4()).await,
            Err(NotificationError::NotFound)
        ));
    }
}
