use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, party_id, paper_type_id, current_quantity, reserved_quantity, \
    current_quantity - reserved_quantity AS available_quantity, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, inventory_item_id, transaction_type, quantity, unit_type, \
    unit_size, total_sheets, balance_after, job_sheet_id, description, created_by, is_deleted, \
    deletion_reason, deleted_by, deleted_at, created_at";

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "inventory_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InventoryTransactionType {
    In,
    Out,
    Adjustment,
    Reserved,
    Released,
}

impl InventoryTransactionType {
    /// In/out/adjustment move stock on hand; reserved/released only move the
    /// reservation against it.
    pub fn affects_on_hand(&self) -> bool {
        matches!(
            self,
            InventoryTransactionType::In
                | InventoryTransactionType::Out
                | InventoryTransactionType::Adjustment
        )
    }
}

/// Paper stock a party keeps with the shop, per paper type.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InventoryItem {
    pub id: Uuid,
    pub party_id: Uuid,
    pub paper_type_id: Uuid,
    pub current_quantity: i64,
    pub reserved_quantity: i64,
    pub available_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InventoryItemDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub item: InventoryItem,
    pub party_name: String,
    pub paper_type_name: String,
    pub gsm: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub transaction_type: InventoryTransactionType,
    pub quantity: i64,
    pub unit_type: String,
    pub unit_size: i64,
    /// Signed effect on available stock.
    pub total_sheets: i64,
    /// Available stock right after this movement.
    pub balance_after: i64,
    pub job_sheet_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: String,
    pub is_deleted: bool,
    pub deletion_reason: Option<String>,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateInventoryTransaction {
    pub party_id: Option<Uuid>,
    pub paper_type_id: Option<Uuid>,
    pub transaction_type: Option<String>,
    pub quantity: Option<i64>,
    pub unit_type: Option<String>,
    pub unit_size: Option<i64>,
    pub job_sheet_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInventoryTransaction<'a> {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub transaction_type: InventoryTransactionType,
    pub quantity: i64,
    pub unit_type: &'a str,
    pub unit_size: i64,
    pub total_sheets: i64,
    pub balance_after: i64,
    pub job_sheet_id: Option<Uuid>,
    pub description: Option<&'a str>,
    pub created_by: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct InventoryTransactionFilter {
    pub inventory_item_id: Option<Uuid>,
    pub party_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
    pub limit: Option<i64>,
}

impl InventoryItem {
    pub async fn find_all_with_details(
        pool: &SqlitePool,
        party_id: Option<Uuid>,
    ) -> Result<Vec<InventoryItemDetails>, sqlx::Error> {
        sqlx::query_as::<_, InventoryItemDetails>(
            "SELECT i.id, i.party_id, i.paper_type_id, i.current_quantity, i.reserved_quantity,
                    i.current_quantity - i.reserved_quantity AS available_quantity,
                    i.created_at, i.updated_at,
                    p.name AS party_name, pt.name AS paper_type_name, pt.gsm
             FROM inventory_items i
             JOIN parties p ON p.id = i.party_id
             JOIN paper_types pt ON pt.id = i.paper_type_id
             WHERE ($1 IS NULL OR i.party_id = $1)
             ORDER BY p.name ASC, pt.name ASC",
        )
        .bind(party_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1");
        sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// The stock row for a (party, paper type) pair, created empty on first use.
    pub async fn find_or_create<'e, E>(
        executor: E,
        party_id: Uuid,
        paper_type_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO inventory_items (id, party_id, paper_type_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (party_id, paper_type_id) DO UPDATE SET updated_at = inventory_items.updated_at
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(Uuid::new_v4())
            .bind(party_id)
            .bind(paper_type_id)
            .fetch_one(executor)
            .await
    }

    pub async fn apply_movement<'e, E>(
        executor: E,
        id: Uuid,
        on_hand_delta: i64,
        reserved_delta: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE inventory_items
             SET current_quantity = current_quantity + $2,
                 reserved_quantity = reserved_quantity + $3,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(id)
            .bind(on_hand_delta)
            .bind(reserved_delta)
            .fetch_one(executor)
            .await
    }

    /// Rebuild on-hand and reserved quantities from the live movements.
    pub async fn recompute_balance<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE inventory_items
             SET current_quantity = (
                     SELECT COALESCE(SUM(total_sheets), 0) FROM inventory_transactions
                      WHERE inventory_item_id = $1 AND is_deleted = 0
                        AND transaction_type IN ('in', 'out', 'adjustment')),
                 reserved_quantity = (
                     SELECT COALESCE(-SUM(total_sheets), 0) FROM inventory_transactions
                      WHERE inventory_item_id = $1 AND is_deleted = 0
                        AND transaction_type IN ('reserved', 'released')),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Items whose available stock has dropped below `threshold` sheets.
    pub async fn count_low_stock(pool: &SqlitePool, threshold: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_items WHERE current_quantity - reserved_quantity < $1",
        )
        .bind(threshold)
        .fetch_one(pool)
        .await
    }
}

impl InventoryTransaction {
    pub async fn find(
        pool: &SqlitePool,
        filter: &InventoryTransactionFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventoryTransaction>(
            "SELECT t.id, t.inventory_item_id, t.transaction_type, t.quantity, t.unit_type,
                    t.unit_size, t.total_sheets, t.balance_after, t.job_sheet_id, t.description,
                    t.created_by, t.is_deleted, t.deletion_reason, t.deleted_by, t.deleted_at,
                    t.created_at
             FROM inventory_transactions t
             JOIN inventory_items i ON i.id = t.inventory_item_id
             WHERE ($1 IS NULL OR t.inventory_item_id = $1)
               AND ($2 IS NULL OR i.party_id = $2)
               AND ($3 OR t.is_deleted = 0)
             ORDER BY t.created_at DESC
             LIMIT $4",
        )
        .bind(filter.inventory_item_id)
        .bind(filter.party_id)
        .bind(filter.include_deleted)
        .bind(filter.limit.unwrap_or(500))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM inventory_transactions WHERE id = $1");
        sqlx::query_as::<_, InventoryTransaction>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &NewInventoryTransaction<'_>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO inventory_transactions
                (id, inventory_item_id, transaction_type, quantity, unit_type, unit_size,
                 total_sheets, balance_after, job_sheet_id, description, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {MOVEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryTransaction>(&sql)
            .bind(data.id)
            .bind(data.inventory_item_id)
            .bind(data.transaction_type)
            .bind(data.quantity)
            .bind(data.unit_type)
            .bind(data.unit_size)
            .bind(data.total_sheets)
            .bind(data.balance_after)
            .bind(data.job_sheet_id)
            .bind(data.description)
            .bind(data.created_by)
            .fetch_one(executor)
            .await
    }

    /// Returns `None` when the movement is missing or already deleted.
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
            "UPDATE inventory_transactions
             SET is_deleted = 1,
                 deletion_reason = $2,
                 deleted_by = $3,
                 deleted_at = datetime('now', 'subsec')
             WHERE id = $1 AND is_deleted = 0
             RETURNING {MOVEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryTransaction>(&sql)
            .bind(id)
            .bind(reason)
            .bind(deleted_by)
            .fetch_optional(executor)
            .await
    }
}
