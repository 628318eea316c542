//! Paper stock held per (party, paper type), moved only through signed
//! stock movements.

use std::str::FromStr;

use db::models::{
    inventory::{
        CreateInventoryTransaction, InventoryItem, InventoryItemDetails, InventoryTransaction,
        InventoryTransactionFilter, InventoryTransactionType, NewInventoryTransaction,
    },
    paper_type::PaperType,
    party::Party,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use utils::text::non_blank_str;
use uuid::Uuid;

use super::soft_delete::{DEFAULT_ACTOR, SoftDeleteError, SoftDeleteRequest, ensure_active};

pub const DEFAULT_UNIT_TYPE: &str = "sheets";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("party not found")]
    PartyNotFound,
    #[error("inventory item not found")]
    ItemNotFound,
    #[error("inventory transaction not found")]
    TransactionNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("insufficient stock: requested {requested} sheets, {available} available")]
    InsufficientStock { requested: i64, available: i64 },
    #[error(transparent)]
    SoftDelete(#[from] SoftDeleteError),
}

/// Signed effect of a movement on available stock.
pub fn signed_total(
    transaction_type: InventoryTransactionType,
    quantity: i64,
    unit_size: i64,
) -> Result<i64, InventoryError> {
    let sheets = quantity
        .checked_mul(unit_size)
        .ok_or_else(|| InventoryError::Validation("quantity x unit_size is too large".into()))?;
    Ok(match transaction_type {
        InventoryTransactionType::In
        | InventoryTransactionType::Released
        | InventoryTransactionType::Adjustment => sheets,
        InventoryTransactionType::Out | InventoryTransactionType::Reserved => -sheets,
    })
}

/// Split a signed total into (on-hand delta, reserved delta).
fn item_deltas(transaction_type: InventoryTransactionType, total: i64) -> (i64, i64) {
    if transaction_type.affects_on_hand() {
        (total, 0)
    } else {
        (0, -total)
    }
}

fn check_stock(
    item: &InventoryItem,
    transaction_type: InventoryTransactionType,
    total: i64,
) -> Result<(), InventoryError> {
    match transaction_type {
        InventoryTransactionType::Out | InventoryTransactionType::Reserved
            if -total > item.available_quantity =>
        {
            Err(InventoryError::InsufficientStock {
                requested: -total,
                available: item.available_quantity,
            })
        }
        InventoryTransactionType::Released if total > item.reserved_quantity => {
            Err(InventoryError::Validation(format!(
                "cannot release {total} sheets, only {} reserved",
                item.reserved_quantity
            )))
        }
        InventoryTransactionType::Adjustment if item.available_quantity + total < 0 => {
            Err(InventoryError::InsufficientStock {
                requested: -total,
                available: item.available_quantity,
            })
        }
        _ => Ok(()),
    }
}

pub struct InventoryService;

impl InventoryService {
    pub async fn list_items(
        pool: &SqlitePool,
        party_id: Option<Uuid>,
    ) -> Result<Vec<InventoryItemDetails>, InventoryError> {
        Ok(InventoryItem::find_all_with_details(pool, party_id).await?)
    }

    pub async fn list_movements(
        pool: &SqlitePool,
        filter: &InventoryTransactionFilter,
    ) -> Result<Vec<InventoryTransaction>, InventoryError> {
        Ok(InventoryTransaction::find(pool, filter).await?)
    }

    /// Record a stock movement, creating the stock row on first use.
    pub async fn record_movement(
        pool: &SqlitePool,
        data: &CreateInventoryTransaction,
    ) -> Result<InventoryTransaction, InventoryError> {
        let party_id = data
            .party_id
            .ok_or_else(|| InventoryError::Validation("party_id is required".into()))?;
        let paper_type_id = data
            .paper_type_id
            .ok_or_else(|| InventoryError::Validation("paper_type_id is required".into()))?;
        let raw_type = non_blank_str(data.transaction_type.as_deref())
            .ok_or_else(|| InventoryError::Validation("transaction_type is required".into()))?;
        let transaction_type = InventoryTransactionType::from_str(&raw_type.to_lowercase())
            .map_err(|_| {
                InventoryError::Validation(format!(
                    "invalid transaction_type '{raw_type}': expected in, out, adjustment, reserved or released"
                ))
            })?;
        let quantity = data
            .quantity
            .ok_or_else(|| InventoryError::Validation("quantity is required".into()))?;
        match transaction_type {
            InventoryTransactionType::Adjustment if quantity == 0 => {
                return Err(InventoryError::Validation(
                    "quantity must be non-zero for adjustments".into(),
                ));
            }
            InventoryTransactionType::Adjustment => {}
            _ if quantity <= 0 => {
                return Err(InventoryError::Validation(
                    "quantity must be greater than zero".into(),
                ));
            }
            _ => {}
        }
        let unit_size = data.unit_size.unwrap_or(1);
        if unit_size < 1 {
            return Err(InventoryError::Validation("unit_size must be at least 1".into()));
        }
        let total = signed_total(transaction_type, quantity, unit_size)?;

        let mut tx = db::begin_write(pool).await?;
        Party::find_by_id(&mut *tx, party_id)
            .await?
            .ok_or(InventoryError::PartyNotFound)?;
        if PaperType::find_by_id(&mut *tx, paper_type_id).await?.is_none() {
            return Err(InventoryError::Validation(
                "paper_type_id does not match a paper type".into(),
            ));
        }

        let item = InventoryItem::find_or_create(&mut *tx, party_id, paper_type_id).await?;
        check_stock(&item, transaction_type, total)?;
        let (on_hand_delta, reserved_delta) = item_deltas(transaction_type, total);
        let item = InventoryItem::apply_movement(&mut *tx, item.id, on_hand_delta, reserved_delta).await?;

        let movement = InventoryTransaction::create(
            &mut *tx,
            &NewInventoryTransaction {
                id: Uuid::new_v4(),
                inventory_item_id: item.id,
                transaction_type,
                quantity,
                unit_type: non_blank_str(data.unit_type.as_deref()).unwrap_or(DEFAULT_UNIT_TYPE),
                unit_size,
                total_sheets: total,
                balance_after: item.available_quantity,
                job_sheet_id: data.job_sheet_id,
                description: non_blank_str(data.description.as_deref()),
                created_by: non_blank_str(data.created_by.as_deref()).unwrap_or(DEFAULT_ACTOR),
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            item_id = %item.id,
            movement_id = %movement.id,
            transaction_type = %transaction_type,
            total_sheets = total,
            available = item.available_quantity,
            "stock movement recorded"
        );
        Ok(movement)
    }

    /// Mark a movement deleted, then rebuild the item's quantities. A failed
    /// rebuild is logged and leaves the deletion in place.
    pub async fn soft_delete_movement(
        pool: &SqlitePool,
        id: Uuid,
        request: &SoftDeleteRequest,
    ) -> Result<InventoryTransaction, InventoryError> {
        let deletion = request.validate()?;
        let existing = InventoryTransaction::find_by_id(pool, id)
            .await?
            .ok_or(InventoryError::TransactionNotFound)?;
        ensure_active(existing.is_deleted, "inventory transaction")?;

        let deleted = InventoryTransaction::mark_deleted(pool, id, deletion.reason, deletion.deleted_by)
            .await?
            .ok_or(SoftDeleteError::AlreadyDeleted("inventory transaction"))?;

        match Self::recompute(pool, deleted.inventory_item_id).await {
            Ok(item) if item.available_quantity < 0 => warn!(
                item_id = %item.id,
                available = item.available_quantity,
                "stock went negative after deleting a movement"
            ),
            Ok(_) => {}
            Err(err) => warn!(
                item_id = %deleted.inventory_item_id,
                error = %err,
                "failed to recompute stock after soft delete"
            ),
        }
        info!(movement_id = %id, reason = deletion.reason, "stock movement soft-deleted");
        Ok(deleted)
    }

    pub async fn recompute(pool: &SqlitePool, item_id: Uuid) -> Result<InventoryItem, InventoryError> {
        InventoryItem::recompute_balance(pool, item_id)
            .await?
            .ok_or(InventoryError::ItemNotFound)
    }
}
