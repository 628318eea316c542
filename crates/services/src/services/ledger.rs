//! Party ledger: keeps `Party.balance` equal to the signed sum of the party's
//! live transactions.
//!
//! Every mutation writes the ledger row and the balance inside one database
//! transaction, and the balance itself moves with a single
//! `balance = balance + delta` statement so concurrent postings cannot lose
//! updates.

use std::str::FromStr;

use db::models::{
    party::Party,
    party_transaction::{
        CreatePartyTransaction, NewPartyTransaction, PartyTransaction, TransactionType,
        UpdatePartyTransaction,
    },
};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::info;
use utils::text::non_blank_str;
use uuid::Uuid;

use super::soft_delete::{DEFAULT_ACTOR, Deletion, SoftDeleteError, SoftDeleteRequest, ensure_active};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("party not found")]
    PartyNotFound,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    SoftDelete(#[from] SoftDeleteError),
}

/// A validated posting against a party.
#[derive(Debug, Clone)]
pub struct LedgerEntry<'a> {
    pub party_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub description: Option<&'a str>,
    pub job_sheet_id: Option<Uuid>,
    pub created_by: &'a str,
}

/// Signed effect of a transaction on the party balance.
pub fn balance_delta(transaction_type: TransactionType, amount: f64) -> f64 {
    match transaction_type {
        TransactionType::Payment | TransactionType::Adjustment => amount,
        TransactionType::Order => -amount,
    }
}

pub fn parse_transaction_type(raw: Option<&str>) -> Result<TransactionType, LedgerError> {
    let raw = non_blank_str(raw).ok_or_else(|| LedgerError::Validation("type is required".into()))?;
    TransactionType::from_str(&raw.to_lowercase()).map_err(|_| {
        LedgerError::Validation(format!(
            "invalid type '{raw}': expected payment, order or adjustment"
        ))
    })
}

pub fn validate_amount(raw: Option<f64>) -> Result<f64, LedgerError> {
    match raw {
        None => Err(LedgerError::Validation("amount is required".into())),
        Some(amount) if !amount.is_finite() => {
            Err(LedgerError::Validation("amount must be a number".into()))
        }
        Some(amount) if amount <= 0.0 => {
            Err(LedgerError::Validation("amount must be greater than zero".into()))
        }
        Some(amount) => Ok(amount),
    }
}

pub struct LedgerService;

impl LedgerService {
    /// `POST /parties/transactions`
    pub async fn record(
        pool: &SqlitePool,
        data: &CreatePartyTransaction,
    ) -> Result<PartyTransaction, LedgerError> {
        let party_id = data
            .party_id
            .ok_or_else(|| LedgerError::Validation("party_id is required".into()))?;
        let transaction_type = parse_transaction_type(data.transaction_type.as_deref())?;
        let amount = validate_amount(data.amount)?;
        let entry = LedgerEntry {
            party_id,
            transaction_type,
            amount,
            description: non_blank_str(data.description.as_deref()),
            job_sheet_id: None,
            created_by: non_blank_str(data.created_by.as_deref()).unwrap_or(DEFAULT_ACTOR),
        };

        let mut tx = db::begin_write(pool).await?;
        let row = Self::record_in(&mut tx, &entry).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Post an entry on an open connection; the caller owns the transaction.
    pub async fn record_in(
        conn: &mut SqliteConnection,
        entry: &LedgerEntry<'_>,
    ) -> Result<PartyTransaction, LedgerError> {
        let delta = balance_delta(entry.transaction_type, entry.amount);
        let balance_after = Party::apply_balance_delta(&mut *conn, entry.party_id, delta)
            .await?
            .ok_or(LedgerError::PartyNotFound)?;

        let row = PartyTransaction::create(
            &mut *conn,
            &NewPartyTransaction {
                id: Uuid::new_v4(),
                party_id: entry.party_id,
                transaction_type: entry.transaction_type,
                amount: entry.amount,
                description: entry.description,
                balance_after,
                job_sheet_id: entry.job_sheet_id,
                created_by: entry.created_by,
            },
        )
        .await?;
        Party::refresh_totals(&mut *conn, entry.party_id).await?;

        info!(
            party_id = %entry.party_id,
            transaction_id = %row.id,
            transaction_type = %row.transaction_type,
            amount = row.amount,
            balance_after,
            "ledger entry recorded"
        );
        Ok(row)
    }

    /// `PUT /transactions/{id}`: swap the old effect for the new one.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdatePartyTransaction,
    ) -> Result<PartyTransaction, LedgerError> {
        let mut tx = db::begin_write(pool).await?;
        let existing = PartyTransaction::find_by_id(&mut *tx, id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)?;

        let transaction_type = match data.transaction_type.as_deref() {
            Some(raw) => parse_transaction_type(Some(raw))?,
            None => existing.transaction_type,
        };
        let amount = match data.amount {
            Some(amount) => validate_amount(Some(amount))?,
            None => existing.amount,
        };
        let updated = Self::reprice_in(
            &mut tx,
            &existing,
            transaction_type,
            amount,
            non_blank_str(data.description.as_deref()),
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn reprice_in(
        conn: &mut SqliteConnection,
        existing: &PartyTransaction,
        transaction_type: TransactionType,
        amount: f64,
        description: Option<&str>,
    ) -> Result<PartyTransaction, LedgerError> {
        if existing.is_deleted {
            return Err(LedgerError::Validation(
                "deleted transactions cannot be edited".into(),
            ));
        }

        let net = balance_delta(transaction_type, amount)
            - balance_delta(existing.transaction_type, existing.amount);
        let balance_after = Party::apply_balance_delta(&mut *conn, existing.party_id, net)
            .await?
            .ok_or(LedgerError::PartyNotFound)?;
        let updated = PartyTransaction::update(
            &mut *conn,
            existing.id,
            transaction_type,
            amount,
            description,
            balance_after,
        )
        .await?;
        Party::refresh_totals(&mut *conn, existing.party_id).await?;

        info!(
            transaction_id = %existing.id,
            party_id = %existing.party_id,
            net,
            balance_after,
            "ledger entry updated"
        );
        Ok(updated)
    }

    /// `PATCH /transactions/{id}/soft-delete`
    pub async fn soft_delete(
        pool: &SqlitePool,
        id: Uuid,
        request: &SoftDeleteRequest,
    ) -> Result<PartyTransaction, LedgerError> {
        let deletion = request.validate()?;
        let mut tx = db::begin_write(pool).await?;
        let row = Self::soft_delete_in(&mut tx, id, &deletion).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Mark a live row deleted and take its effect back out of the balance.
    pub async fn soft_delete_in(
        conn: &mut SqliteConnection,
        id: Uuid,
        deletion: &Deletion<'_>,
    ) -> Result<PartyTransaction, LedgerError> {
        let existing = PartyTransaction::find_by_id(&mut *conn, id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)?;
        ensure_active(existing.is_deleted, "transaction")?;

        let deleted =
            PartyTransaction::mark_deleted(&mut *conn, id, deletion.reason, deletion.deleted_by)
                .await?
                .ok_or(SoftDeleteError::AlreadyDeleted("transaction"))?;
        let reversal = -balance_delta(deleted.transaction_type, deleted.amount);
        let balance = Party::apply_balance_delta(&mut *conn, deleted.party_id, reversal)
            .await?
            .ok_or(LedgerError::PartyNotFound)?;
        Party::refresh_totals(&mut *conn, deleted.party_id).await?;

        info!(
            transaction_id = %id,
            party_id = %deleted.party_id,
            reason = deletion.reason,
            balance,
            "ledger entry soft-deleted"
        );
        Ok(deleted)
    }

    /// `DELETE /transactions/{id}`: reverse (unless already reversed by a
    /// soft delete) and remove the row.
    pub async fn hard_delete(pool: &SqlitePool, id: Uuid) -> Result<PartyTransaction, LedgerError> {
        let mut tx = db::begin_write(pool).await?;
        let existing = PartyTransaction::find_by_id(&mut *tx, id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)?;
        Self::hard_delete_in(&mut tx, &existing).await?;
        tx.commit().await?;
        Ok(existing)
    }

    pub async fn hard_delete_in(
        conn: &mut SqliteConnection,
        existing: &PartyTransaction,
    ) -> Result<(), LedgerError> {
        if !existing.is_deleted {
            let reversal = -balance_delta(existing.transaction_type, existing.amount);
            Party::apply_balance_delta(&mut *conn, existing.party_id, reversal)
                .await?
                .ok_or(LedgerError::PartyNotFound)?;
        }
        PartyTransaction::delete(&mut *conn, existing.id).await?;
        Party::refresh_totals(&mut *conn, existing.party_id).await?;

        info!(
            transaction_id = %existing.id,
            party_id = %existing.party_id,
            "ledger entry deleted"
        );
        Ok(())
    }

    /// Server-side repair: rebuild a party's balance and totals from its live rows.
    pub async fn recompute(pool: &SqlitePool, party_id: Uuid) -> Result<Party, LedgerError> {
        let party = Party::recompute_stats(pool, party_id)
            .await?
            .ok_or(LedgerError::PartyNotFound)?;
        info!(party_id = %party_id, balance = party.balance, "party stats recomputed");
        Ok(party)
    }
}

#[cfg(test)]
mod tests {
    use db::models::party::CreateParty;

    use super::*;
    use crate::test_support::test_db;

    async fn party_with_balance(pool: &SqlitePool, balance: f64) -> Party {
        let party = Party::create(pool, Uuid::new_v4(), "Ganesh Graphics", &CreateParty::default())
            .await
            .unwrap();
        if balance != 0.0 {
            let kind = if balance > 0.0 { "payment" } else { "order" };
            post(pool, party.id, kind, balance.abs()).await;
        }
        Party::find_by_id(pool, party.id).await.unwrap().unwrap()
    }

    async fn post(pool: &SqlitePool, party_id: Uuid, kind: &str, amount: f64) -> PartyTransaction {
        LedgerService::record(
            pool,
            &CreatePartyTransaction {
                party_id: Some(party_id),
                transaction_type: Some(kind.to_string()),
                amount: Some(amount),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    async fn balance_of(pool: &SqlitePool, party_id: Uuid) -> f64 {
        Party::find_by_id(pool, party_id).await.unwrap().unwrap().balance
    }

    fn reason(text: &str) -> SoftDeleteRequest {
        SoftDeleteRequest {
            deletion_reason: Some(text.to_string()),
            deleted_by: Some("Accounts".to_string()),
        }
    }

    #[test]
    fn deltas_follow_transaction_type() {
        assert_eq!(balance_delta(TransactionType::Payment, 500.0), 500.0);
        assert_eq!(balance_delta(TransactionType::Order, 500.0), -500.0);
        assert_eq!(balance_delta(TransactionType::Adjustment, 20.0), 20.0);
    }

    #[test]
    fn amount_and_type_validation() {
        assert!(validate_amount(Some(0.0)).is_err());
        assert!(validate_amount(Some(-5.0)).is_err());
        assert!(validate_amount(Some(f64::NAN)).is_err());
        assert!(validate_amount(None).is_err());
        assert_eq!(validate_amount(Some(12.5)).unwrap(), 12.5);

        assert_eq!(parse_transaction_type(Some("Payment")).unwrap(), TransactionType::Payment);
        assert!(matches!(parse_transaction_type(Some("refund")), Err(LedgerError::Validation(_))));
        assert!(matches!(parse_transaction_type(None), Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn payment_raises_balance_and_snapshots_it() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 1000.0).await;

        let row = post(&db.pool, party.id, "payment", 500.0).await;
        assert_eq!(row.balance_after, 1500.0);
        assert_eq!(balance_of(&db.pool, party.id).await, 1500.0);
    }

    #[tokio::test]
    async fn order_lowers_balance() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 1000.0).await;

        let row = post(&db.pool, party.id, "order", 300.0).await;
        assert_eq!(row.balance_after, 700.0);
        assert_eq!(balance_of(&db.pool, party.id).await, 700.0);

        let party = Party::find_by_id(&db.pool, party.id).await.unwrap().unwrap();
        assert_eq!(party.total_orders, 300.0);
        assert_eq!(party.total_payments, 1000.0);
        assert_eq!(party.transaction_count, 2);
    }

    #[tokio::test]
    async fn soft_delete_reverses_payments_and_orders() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 1000.0).await;

        let payment = post(&db.pool, party.id, "payment", 250.0).await;
        LedgerService::soft_delete(&db.pool, payment.id, &reason("bounced cheque"))
            .await
            .unwrap();
        assert_eq!(balance_of(&db.pool, party.id).await, 1000.0);

        let order = post(&db.pool, party.id, "order", 400.0).await;
        assert_eq!(balance_of(&db.pool, party.id).await, 600.0);
        let deleted = LedgerService::soft_delete(&db.pool, order.id, &reason("entered twice"))
            .await
            .unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.deleted_by.as_deref(), Some("Accounts"));
        assert_eq!(balance_of(&db.pool, party.id).await, 1000.0);
    }

    #[tokio::test]
    async fn second_soft_delete_is_rejected_without_side_effects() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 0.0).await;
        let payment = post(&db.pool, party.id, "payment", 90.0).await;

        LedgerService::soft_delete(&db.pool, payment.id, &reason("typo"))
            .await
            .unwrap();
        let after_first = balance_of(&db.pool, party.id).await;

        let err = LedgerService::soft_delete(&db.pool, payment.id, &reason("typo again"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::SoftDelete(SoftDeleteError::AlreadyDeleted("transaction"))
        ));
        assert_eq!(balance_of(&db.pool, party.id).await, after_first);

        let stored = PartyTransaction::find_by_id(&db.pool, payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.deletion_reason.as_deref(), Some("typo"));
    }

    #[tokio::test]
    async fn soft_delete_requires_reason() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 0.0).await;
        let payment = post(&db.pool, party.id, "payment", 10.0).await;

        let err = LedgerService::soft_delete(&db.pool, payment.id, &SoftDeleteRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SoftDelete(SoftDeleteError::MissingReason)));
        assert_eq!(balance_of(&db.pool, party.id).await, 10.0);
    }

    #[tokio::test]
    async fn adjustment_delete_reverses_its_credit() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 100.0).await;
        let adjustment = post(&db.pool, party.id, "adjustment", 15.0).await;
        assert_eq!(adjustment.balance_after, 115.0);

        LedgerService::soft_delete(&db.pool, adjustment.id, &reason("not agreed"))
            .await
            .unwrap();
        assert_eq!(balance_of(&db.pool, party.id).await, 100.0);
    }

    #[tokio::test]
    async fn unknown_party_is_not_found_and_writes_nothing() {
        let (db, _dir) = test_db().await;
        let err = LedgerService::record(
            &db.pool,
            &CreatePartyTransaction {
                party_id: Some(Uuid::new_v4()),
                transaction_type: Some("payment".into()),
                amount: Some(10.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::PartyNotFound));

        let rows = PartyTransaction::find(&db.pool, &Default::default()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn update_swaps_old_effect_for_new() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 1000.0).await;
        let order = post(&db.pool, party.id, "order", 200.0).await;
        assert_eq!(balance_of(&db.pool, party.id).await, 800.0);

        let updated = LedgerService::update(
            &db.pool,
            order.id,
            &UpdatePartyTransaction {
                transaction_type: None,
                amount: Some(350.0),
                description: Some("reprinted".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.amount, 350.0);
        assert_eq!(updated.balance_after, 650.0);
        assert_eq!(balance_of(&db.pool, party.id).await, 650.0);

        let flipped = LedgerService::update(
            &db.pool,
            order.id,
            &UpdatePartyTransaction {
                transaction_type: Some("payment".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(flipped.transaction_type, TransactionType::Payment);
        assert_eq!(balance_of(&db.pool, party.id).await, 1350.0);
    }

    #[tokio::test]
    async fn hard_delete_reverses_only_live_rows() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 500.0).await;
        let payment = post(&db.pool, party.id, "payment", 100.0).await;
        let order = post(&db.pool, party.id, "order", 50.0).await;
        assert_eq!(balance_of(&db.pool, party.id).await, 550.0);

        LedgerService::hard_delete(&db.pool, payment.id).await.unwrap();
        assert_eq!(balance_of(&db.pool, party.id).await, 450.0);

        LedgerService::soft_delete(&db.pool, order.id, &reason("cancelled"))
            .await
            .unwrap();
        assert_eq!(balance_of(&db.pool, party.id).await, 500.0);
        LedgerService::hard_delete(&db.pool, order.id).await.unwrap();
        assert_eq!(balance_of(&db.pool, party.id).await, 500.0);

        assert!(matches!(
            LedgerService::hard_delete(&db.pool, order.id).await,
            Err(LedgerError::TransactionNotFound)
        ));
    }

    #[tokio::test]
    async fn recompute_matches_incremental_balance() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 0.0).await;
        post(&db.pool, party.id, "payment", 1200.0).await;
        let order = post(&db.pool, party.id, "order", 450.0).await;
        post(&db.pool, party.id, "adjustment", 25.0).await;
        LedgerService::soft_delete(&db.pool, order.id, &reason("void"))
            .await
            .unwrap();

        let incremental = balance_of(&db.pool, party.id).await;
        let recomputed = LedgerService::recompute(&db.pool, party.id).await.unwrap();
        assert_eq!(recomputed.balance, incremental);
        assert_eq!(recomputed.balance, 1225.0);
        assert_eq!(recomputed.total_orders, 0.0);
        assert_eq!(recomputed.transaction_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_soft_deletes_all_succeed() {
        let (db, _dir) = test_db().await;
        let party = party_with_balance(&db.pool, 0.0).await;
        let mut rows = Vec::new();
        for _ in 0..40 {
            rows.push(post(&db.pool, party.id, "payment", 10.0).await);
        }
        assert_eq!(balance_of(&db.pool, party.id).await, 400.0);

        let handles: Vec<_> = rows
            .iter()
            .map(|row| {
                let pool = db.pool.clone();
                let id = row.id;
                tokio::spawn(async move {
                    LedgerService::soft_delete(&pool, id, &reason("batch reversed")).await
                })
            })
            .collect();

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                failures.push(err.to_string());
            }
        }
        assert!(failures.is_empty(), "{failures:?}");
        assert_eq!(balance_of(&db.pool, party.id).await, 0.0);
    }
}
