//! Startup and health checks on the print-shop schema.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

/// Tables every handler relies on.
pub const REQUIRED_TABLES: &[&str] = &[
    "parties",
    "party_transactions",
    "job_sheets",
    "paper_types",
    "inventory_items",
    "inventory_transactions",
    "machines",
    "operator_notifications",
    "email_notifications",
    "quotation_requests",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database is missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SchemaStatus {
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
}

pub struct DatabaseValidator;

impl DatabaseValidator {
    /// Fail unless every required table exists.
    pub async fn validate(pool: &SqlitePool) -> Result<SchemaStatus, DatabaseValidationError> {
        let missing = Self::missing_tables(pool, REQUIRED_TABLES).await?;
        if !missing.is_empty() {
            warn!(missing = ?missing, "database schema incomplete");
            return Err(DatabaseValidationError::MissingTables(missing));
        }

        let status = Self::status(pool).await?;
        info!(
            migrations_applied = status.migrations_applied,
            latest = ?status.latest_migration,
            "database schema validated"
        );
        Ok(status)
    }

    pub async fn status(pool: &SqlitePool) -> Result<SchemaStatus, DatabaseValidationError> {
        let migrations_applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(pool)
                .await?;
        let latest_migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await?;
        Ok(SchemaStatus {
            migrations_applied,
            latest_migration,
        })
    }

    pub async fn missing_tables(
        pool: &SqlitePool,
        required: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing = Vec::new();
        for table in required {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
            )
            .bind(table)
            .fetch_one(pool)
            .await?
                > 0;
            if !exists {
                missing.push(table.to_string());
            }
        }
        Ok(missing)
    }
}
