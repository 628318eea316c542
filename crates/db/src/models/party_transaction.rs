use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = "id, party_id, transaction_type, amount, description, \
    balance_after, job_sheet_id, created_by, is_deleted, deletion_reason, deleted_by, \
    deleted_at, created_at";

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionType {
    Payment,
    Order,
    Adjustment,
}

/// One row of a party's ledger. `amount` is always a positive magnitude; the
/// direction comes from `transaction_type`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PartyTransaction {
    pub id: Uuid,
    pub party_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: Option<String>,
    pub balance_after: f64,
    pub job_sheet_id: Option<Uuid>,
    pub created_by: String,
    pub is_deleted: bool,
    pub deletion_reason: Option<String>,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for recording a ledger row. Fields are optional so that
/// validation can name what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreatePartyTransaction {
    pub party_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdatePartyTransaction {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

/// Validated row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewPartyTransaction<'a> {
    pub id: Uuid,
    pub party_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: Option<&'a str>,
    pub balance_after: f64,
    pub job_sheet_id: Option<Uuid>,
    pub created_by: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct TransactionFilter {
    pub party_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
    pub limit: Option<i64>,
}

impl PartyTransaction {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM party_transactions WHERE id = $1");
        sqlx::query_as::<_, PartyTransaction>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find(pool: &SqlitePool, filter: &TransactionFilter) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM party_transactions
             WHERE ($1 IS NULL OR party_id = $1)
               AND ($2 OR is_deleted = 0)
             ORDER BY created_at DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, PartyTransaction>(&sql)
            .bind(filter.party_id)
            .bind(filter.include_deleted)
            .bind(filter.limit.unwrap_or(500))
            .fetch_all(pool)
            .await
    }

    /// Ledger rows raised by a job sheet, oldest first.
    pub async fn find_by_job_sheet<'e, E>(
        executor: E,
        job_sheet_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM party_transactions
             WHERE job_sheet_id = $1 AND ($2 OR is_deleted = 0)
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, PartyTransaction>(&sql)
            .bind(job_sheet_id)
            .bind(include_deleted)
            .fetch_all(executor)
            .await
    }

    pub async fn create<'e, E>(executor: E, data: &NewPartyTransaction<'_>) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO party_transactions
                (id, party_id, transaction_type, amount, description, balance_after, job_sheet_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TRANSACTION_COLUMNS}"
        );
        sqlx::query_as::<_, PartyTransaction>(&sql)
            .bind(data.id)
            .bind(data.party_id)
            .bind(data.transaction_type)
            .bind(data.amount)
            .bind(data.description)
            .bind(data.balance_after)
            .bind(data.job_sheet_id)
            .bind(data.created_by)
            .fetch_one(executor)
            .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        transaction_type: TransactionType,
        amount: f64,
        description: Option<&str>,
        balance_after: f64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE party_transactions
             SET transaction_type = $2,
                 amount = $3,
                 description = COALESCE($4, description),
                 balance_after = $5
             WHERE id = $1
             RETURNING {TRANSACTION_COLUMNS}"
        );
        sqlx::query_as::<_, PartyTransaction>(&sql)
            .bind(id)
            .bind(transaction_type)
            .bind(amount)
            .bind(description)
            .bind(balance_after)
            .fetch_one(executor)
            .await
    }

    /// Flag a live row as deleted. Returns `None` when the row is missing or
    /// already deleted, so a repeated call never touches the row twice.
    pub async fn mark_deleted<'e, E>(
        executor: E,
        id: Uuid,
        reason: &str,
        deleted_by: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE party_transactions
             SET is_deleted = 1,
                 deletion_reason = $2,
                 deleted_by = $3,
                 deleted_at = datetime('now', 'subsec')
             WHERE id = $1 AND is_deleted = 0
             RETURNING {TRANSACTION_COLUMNS}"
        );
        sqlx::query_as::<_, PartyTransaction>(&sql)
            .bind(id)
            .bind(reason)
            .bind(deleted_by)
            .fetch_optional(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM party_transactions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
