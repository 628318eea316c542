//! Job sheets and the `order` ledger rows they raise against their party.

use db::models::{
    job_sheet::{CreateJobSheet, JobSheet, JobSheetFilter, UpdateJobSheet},
    paper_type::PaperType,
    party::Party,
    party_transaction::{PartyTransaction, TransactionType},
};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::info;
use utils::text::non_blank_str;
use uuid::Uuid;

use super::{
    ledger::{LedgerEntry, LedgerError, LedgerService},
    soft_delete::{DEFAULT_ACTOR, Deletion, SoftDeleteError, SoftDeleteRequest, ensure_active},
};

#[derive(Debug, Error)]
pub enum JobSheetError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("job sheet not found")]
    NotFound,
    #[error("party not found")]
    PartyNotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    SoftDelete(#[from] SoftDeleteError),
}

fn validate_costs(costs: [(&str, Option<f64>); 3]) -> Result<(), JobSheetError> {
    for (field, value) in costs {
        if let Some(v) = value
            && (!v.is_finite() || v < 0.0)
        {
            return Err(JobSheetError::Validation(format!(
                "{field} must be a non-negative number"
            )));
        }
    }
    Ok(())
}

fn order_description(job: &JobSheet) -> String {
    format!("Job sheet: {}", job.description)
}

pub struct JobSheetService;

impl JobSheetService {
    pub async fn list(pool: &SqlitePool, filter: &JobSheetFilter) -> Result<Vec<JobSheet>, JobSheetError> {
        Ok(JobSheet::find(pool, filter).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<JobSheet, JobSheetError> {
        JobSheet::find_by_id(pool, id).await?.ok_or(JobSheetError::NotFound)
    }

    /// Create the sheet and, when it is billed to a party, charge the total
    /// as an `order` in the same database transaction.
    pub async fn create(pool: &SqlitePool, data: &CreateJobSheet) -> Result<JobSheet, JobSheetError> {
        let description = non_blank_str(data.description.as_deref())
            .ok_or_else(|| JobSheetError::Validation("description is required".into()))?;
        validate_costs([
            ("printing", data.printing),
            ("uv", data.uv),
            ("baking", data.baking),
        ])?;

        let mut tx = db::begin_write(pool).await?;
        if let Some(paper_type_id) = data.paper_type_id
            && PaperType::find_by_id(&mut *tx, paper_type_id).await?.is_none()
        {
            return Err(JobSheetError::Validation(
                "paper_type_id does not match a paper type".into(),
            ));
        }
        let party = match data.party_id {
            Some(party_id) => Some(
                Party::find_by_id(&mut *tx, party_id)
                    .await?
                    .ok_or(JobSheetError::PartyNotFound)?,
            ),
            None => None,
        };

        let job = JobSheet::create(
            &mut *tx,
            Uuid::new_v4(),
            data,
            description,
            party.as_ref().map(|p| p.name.as_str()),
        )
        .await?;

        if let Some(party) = &party
            && job.total_cost() > 0.0
        {
            let description = order_description(&job);
            LedgerService::record_in(
                &mut tx,
                &LedgerEntry {
                    party_id: party.id,
                    transaction_type: TransactionType::Order,
                    amount: job.total_cost(),
                    description: Some(&description),
                    job_sheet_id: Some(job.id),
                    created_by: non_blank_str(data.created_by.as_deref()).unwrap_or(DEFAULT_ACTOR),
                },
            )
            .await?;
        }
        tx.commit().await?;

        info!(
            job_sheet_id = %job.id,
            party_id = ?job.party_id,
            total = job.total_cost(),
            "job sheet created"
        );
        Ok(job)
    }

    /// Patch the sheet; when a cost field changes the linked order follows it.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateJobSheet,
    ) -> Result<JobSheet, JobSheetError> {
        if data.description.is_some() && non_blank_str(data.description.as_deref()).is_none() {
            return Err(JobSheetError::Validation("description cannot be blank".into()));
        }
        validate_costs([
            ("printing", data.printing),
            ("uv", data.uv),
            ("baking", data.baking),
        ])?;

        let mut tx = db::begin_write(pool).await?;
        let existing = JobSheet::find_by_id(&mut *tx, id)
            .await?
            .ok_or(JobSheetError::NotFound)?;
        if existing.is_deleted {
            return Err(JobSheetError::Validation(
                "deleted job sheets cannot be edited".into(),
            ));
        }
        if let Some(paper_type_id) = data.paper_type_id
            && PaperType::find_by_id(&mut *tx, paper_type_id).await?.is_none()
        {
            return Err(JobSheetError::Validation(
                "paper_type_id does not match a paper type".into(),
            ));
        }

        let data = UpdateJobSheet {
            description: data.description.as_deref().map(|d| d.trim().to_string()),
            ..data.clone()
        };
        let job = JobSheet::update(&mut *tx, id, &data)
            .await?
            .ok_or(JobSheetError::NotFound)?;

        if data.touches_costs()
            && let Some(party_id) = job.party_id
        {
            Self::reprice_order(&mut tx, &job, party_id).await?;
        }
        tx.commit().await?;
        Ok(job)
    }

    async fn reprice_order(
        conn: &mut SqliteConnection,
        job: &JobSheet,
        party_id: Uuid,
    ) -> Result<(), JobSheetError> {
        let linked = PartyTransaction::find_by_job_sheet(&mut *conn, job.id, false).await?;
        let order = linked
            .iter()
            .find(|t| t.transaction_type == TransactionType::Order);
        let total = job.total_cost();
        let description = order_description(job);

        match order {
            Some(order) if total > 0.0 => {
                if order.amount != total {
                    LedgerService::reprice_in(
                        conn,
                        order,
                        TransactionType::Order,
                        total,
                        Some(&description),
                    )
                    .await?;
                }
            }
            Some(order) => {
                let deletion = Deletion {
                    reason: "job sheet total cleared",
                    deleted_by: DEFAULT_ACTOR,
                };
                LedgerService::soft_delete_in(conn, order.id, &deletion).await?;
            }
            None if total > 0.0 => {
                LedgerService::record_in(
                    conn,
                    &LedgerEntry {
                        party_id,
                        transaction_type: TransactionType::Order,
                        amount: total,
                        description: Some(&description),
                        job_sheet_id: Some(job.id),
                        created_by: DEFAULT_ACTOR,
                    },
                )
                .await?;
            }
            None => {}
        }
        info!(job_sheet_id = %job.id, total, "job sheet charge updated");
        Ok(())
    }

    /// Soft-delete the sheet and every live ledger row it raised, with the
    /// same reason.
    pub async fn soft_delete(
        pool: &SqlitePool,
        id: Uuid,
        request: &SoftDeleteRequest,
    ) -> Result<JobSheet, JobSheetError> {
        let deletion = request.validate()?;
        let mut tx = db::begin_write(pool).await?;
        let existing = JobSheet::find_by_id(&mut *tx, id)
            .await?
            .ok_or(JobSheetError::NotFound)?;
        ensure_active(existing.is_deleted, "job sheet")?;

        let job = JobSheet::mark_deleted(&mut *tx, id, deletion.reason, deletion.deleted_by)
            .await?
            .ok_or(SoftDeleteError::AlreadyDeleted("job sheet"))?;
        let linked = PartyTransaction::find_by_job_sheet(&mut *tx, id, false).await?;
        for row in &linked {
            LedgerService::soft_delete_in(&mut tx, row.id, &deletion).await?;
        }
        tx.commit().await?;

        info!(
            job_sheet_id = %id,
            reason = deletion.reason,
            reversed = linked.len(),
            "job sheet soft-deleted"
        );
        Ok(job)
    }

    /// Remove the sheet and its ledger rows, reversing any that are still live.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), JobSheetError> {
        let mut tx = db::begin_write(pool).await?;
        JobSheet::find_by_id(&mut *tx, id)
            .await?
            .ok_or(JobSheetError::NotFound)?;
        let linked = PartyTransaction::find_by_job_sheet(&mut *tx, id, true).await?;
        for row in &linked {
            LedgerService::hard_delete_in(&mut tx, row).await?;
        }
        JobSheet::delete(&mut *tx, id).await?;
        tx.commit().await?;

        info!(job_sheet_id = %id, removed_transactions = linked.len(), "job sheet deleted");
        Ok(())
    }
}
