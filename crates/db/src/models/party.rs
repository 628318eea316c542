use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

const PARTY_COLUMNS: &str = "id, name, phone, email, address, balance, credit_limit, \
    total_orders, total_payments, transaction_count, last_transaction_at, created_at, updated_at";

/// A customer account. `balance` is positive when the party holds an advance
/// and negative when it owes the shop.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub balance: f64,
    pub credit_limit: Option<f64>,
    pub total_orders: f64,
    pub total_payments: f64,
    pub transaction_count: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateParty {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_limit: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateParty {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_limit: Option<f64>,
}

impl Party {
    pub async fn find_all(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = search.map(|s| format!("%{}%", s.to_lowercase()));
        let sql = format!(
            "SELECT {PARTY_COLUMNS} FROM parties
             WHERE ($1 IS NULL OR lower(name) LIKE $1)
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, Party>(&sql)
            .bind(pattern)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {PARTY_COLUMNS} FROM parties WHERE id = $1");
        sqlx::query_as::<_, Party>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        data: &CreateParty,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO parties (id, name, phone, email, address, credit_limit)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PARTY_COLUMNS}"
        );
        sqlx::query_as::<_, Party>(&sql)
            .bind(id)
            .bind(name)
            .bind(&data.phone)
            .bind(&data.email)
            .bind(&data.address)
            .bind(data.credit_limit)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateParty,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE parties
             SET name = COALESCE($2, name),
                 phone = COALESCE($3, phone),
                 email = COALESCE($4, email),
                 address = COALESCE($5, address),
                 credit_limit = COALESCE($6, credit_limit),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {PARTY_COLUMNS}"
        );
        sqlx::query_as::<_, Party>(&sql)
            .bind(id)
            .bind(&data.name)
            .bind(&data.phone)
            .bind(&data.email)
            .bind(&data.address)
            .bind(data.credit_limit)
            .fetch_optional(pool)
            .await
    }

    /// Add `delta` to the stored balance in a single statement and return the new balance.
    /// `None` means the party does not exist.
    pub async fn apply_balance_delta<'e, E>(
        executor: E,
        id: Uuid,
        delta: f64,
    ) -> Result<Option<f64>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, f64>(
            "UPDATE parties
             SET balance = balance + $2,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING balance",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await
    }

    /// Refresh order/payment totals from the live ledger rows, leaving `balance` alone.
    pub async fn refresh_totals<'e, E>(executor: E, id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE parties
             SET total_orders = (
                     SELECT TOTAL(amount) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0 AND transaction_type = 'order'),
                 total_payments = (
                     SELECT TOTAL(amount) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0 AND transaction_type = 'payment'),
                 transaction_count = (
                     SELECT COUNT(*) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0),
                 last_transaction_at = (
                     SELECT MAX(created_at) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0)
             WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Rebuild balance and totals from scratch out of the non-deleted ledger rows.
    pub async fn recompute_stats<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE parties
             SET balance = (
                     SELECT TOTAL(CASE WHEN transaction_type = 'order' THEN -amount ELSE amount END)
                       FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0),
                 total_orders = (
                     SELECT TOTAL(amount) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0 AND transaction_type = 'order'),
                 total_payments = (
                     SELECT TOTAL(amount) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0 AND transaction_type = 'payment'),
                 transaction_count = (
                     SELECT COUNT(*) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0),
                 last_transaction_at = (
                     SELECT MAX(created_at) FROM party_transactions
                      WHERE party_id = $1 AND is_deleted = 0),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {PARTY_COLUMNS}"
        );
        sqlx::query_as::<_, Party>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Live ledger rows, live job sheets and non-empty stock rows referencing the party.
    pub async fn count_dependents(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT
                (SELECT COUNT(*) FROM party_transactions WHERE party_id = $1 AND is_deleted = 0)
              + (SELECT COUNT(*) FROM job_sheets WHERE party_id = $1 AND is_deleted = 0)
              + (SELECT COUNT(*) FROM inventory_items
                  WHERE party_id = $1 AND (current_quantity != 0 OR reserved_quantity != 0))",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM parties WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn balance_delta_is_applied_in_place() {
        let (db, _dir) = test_db().await;
        let party = Party::create(&db.pool, Uuid::new_v4(), "Sharma Traders", &CreateParty::default())
            .await
            .unwrap();
        assert_eq!(party.balance, 0.0);

        let after = Party::apply_balance_delta(&db.pool, party.id, 250.5).await.unwrap();
        assert_eq!(after, Some(250.5));
        let after = Party::apply_balance_delta(&db.pool, party.id, -100.0).await.unwrap();
        assert_eq!(after, Some(150.5));

        let missing = Party::apply_balance_delta(&db.pool, Uuid::new_v4(), 1.0).await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn search_matches_case_insensitively() {
        let (db, _dir) = test_db().await;
        for name in ["Alpha Prints", "Beta Packaging"] {
            Party::create(&db.pool, Uuid::new_v4(), name, &CreateParty::default())
                .await
                .unwrap();
        }
        let found = Party::find_all(&db.pool, Some("PACK")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Beta Packaging");
        assert_eq!(Party::find_all(&db.pool, None).await.unwrap().len(), 2);
    }
}
