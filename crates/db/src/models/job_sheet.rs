use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const JOB_SHEET_COLUMNS: &str = "id, party_id, party_name, description, sheet, plate, size, \
    sq_inch, paper_sheet, imp, rate, printing, uv, baking, job_date, paper_type_id, \
    paper_provided_by_party, job_status, machine_id, assigned_at, started_at, completed_at, \
    operator_notes, is_deleted, deletion_reason, deleted_by, deleted_at, created_at, updated_at";

/// Where a job sits in the press-room workflow.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Statuses that keep a machine busy.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Assigned | JobStatus::InProgress)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct JobSheet {
    pub id: Uuid,
    pub party_id: Option<Uuid>,
    pub party_name: Option<String>, // Snapshot of the party name at creation
    pub description: String,
    pub sheet: Option<i64>,
    pub plate: Option<i64>,
    pub size: Option<String>,
    pub sq_inch: Option<f64>,
    pub paper_sheet: Option<i64>,
    pub imp: Option<i64>,
    pub rate: Option<f64>,
    pub printing: f64,
    pub uv: f64,
    pub baking: f64,
    pub job_date: Option<NaiveDate>,
    pub paper_type_id: Option<Uuid>,
    pub paper_provided_by_party: bool,
    pub job_status: JobStatus,
    pub machine_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub operator_notes: Option<String>,
    pub is_deleted: bool,
    pub deletion_reason: Option<String>,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobSheet {
    /// Amount charged to the party for this job.
    pub fn total_cost(&self) -> f64 {
        self.printing + self.uv + self.baking
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateJobSheet {
    pub party_id: Option<Uuid>,
    pub description: Option<String>,
    pub sheet: Option<i64>,
    pub plate: Option<i64>,
    pub size: Option<String>,
    pub sq_inch: Option<f64>,
    pub paper_sheet: Option<i64>,
    pub imp: Option<i64>,
    pub rate: Option<f64>,
    pub printing: Option<f64>,
    pub uv: Option<f64>,
    pub baking: Option<f64>,
    pub job_date: Option<NaiveDate>,
    pub paper_type_id: Option<Uuid>,
    pub paper_provided_by_party: Option<bool>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateJobSheet {
    pub description: Option<String>,
    pub sheet: Option<i64>,
    pub plate: Option<i64>,
    pub size: Option<String>,
    pub sq_inch: Option<f64>,
    pub paper_sheet: Option<i64>,
    pub imp: Option<i64>,
    pub rate: Option<f64>,
    pub printing: Option<f64>,
    pub uv: Option<f64>,
    pub baking: Option<f64>,
    pub job_date: Option<NaiveDate>,
    pub paper_type_id: Option<Uuid>,
    pub paper_provided_by_party: Option<bool>,
}

impl UpdateJobSheet {
    pub fn touches_costs(&self) -> bool {
        self.printing.is_some() || self.uv.is_some() || self.baking.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct JobSheetFilter {
    pub party_id: Option<Uuid>,
    pub machine_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub include_deleted: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JobSheet {
    pub async fn find(pool: &SqlitePool, filter: &JobSheetFilter) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {JOB_SHEET_COLUMNS} FROM job_sheets
             WHERE ($1 IS NULL OR party_id = $1)
               AND ($2 IS NULL OR machine_id = $2)
               AND ($3 IS NULL OR job_status = $3)
               AND ($4 OR is_deleted = 0)
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, JobSheet>(&sql)
            .bind(filter.party_id)
            .bind(filter.machine_id)
            .bind(filter.status)
            .bind(filter.include_deleted)
            .bind(filter.limit.unwrap_or(100))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {JOB_SHEET_COLUMNS} FROM job_sheets WHERE id = $1");
        sqlx::query_as::<_, JobSheet>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreateJobSheet,
        description: &str,
        party_name: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO job_sheets
                (id, party_id, party_name, description, sheet, plate, size, sq_inch, paper_sheet,
                 imp, rate, printing, uv, baking, job_date, paper_type_id, paper_provided_by_party)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
             RETURNING {JOB_SHEET_COLUMNS}"
        );
        sqlx::query_as::<_, JobSheet>(&sql)
            .bind(id)
            .bind(data.party_id)
            .bind(party_name)
            .bind(description)
            .bind(data.sheet)
            .bind(data.plate)
            .bind(&data.size)
            .bind(data.sq_inch)
            .bind(data.paper_sheet)
            .bind(data.imp)
            .bind(data.rate)
            .bind(data.printing.unwrap_or(0.0))
            .bind(data.uv.unwrap_or(0.0))
            .bind(data.baking.unwrap_or(0.0))
            .bind(data.job_date)
            .bind(data.paper_type_id)
            .bind(data.paper_provided_by_party.unwrap_or(false))
            .fetch_one(executor)
            .await
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, data: &UpdateJobSheet) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE job_sheets
             SET description = COALESCE($2, description),
                 sheet = COALESCE($3, sheet),
                 plate = COALESCE($4, plate),
                 size = COALESCE($5, size),
                 sq_inch = COALESCE($6, sq_inch),
                 paper_sheet = COALESCE($7, paper_sheet),
                 imp = COALESCE($8, imp),
                 rate = COALESCE($9, rate),
                 printing = COALESCE($10, printing),
                 uv = COALESCE($11, uv),
                 baking = COALESCE($12, baking),
                 job_date = COALESCE($13, job_date),
                 paper_type_id = COALESCE($14, paper_type_id),
                 paper_provided_by_party = COALESCE($15, paper_provided_by_party),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {JOB_SHEET_COLUMNS}"
        );
        sqlx::query_as::<_, JobSheet>(&sql)
            .bind(id)
            .bind(&data.description)
            .bind(data.sheet)
            .bind(data.plate)
            .bind(&data.size)
            .bind(data.sq_inch)
            .bind(data.paper_sheet)
            .bind(data.imp)
            .bind(data.rate)
            .bind(data.printing)
            .bind(data.uv)
            .bind(data.baking)
            .bind(data.job_date)
            .bind(data.paper_type_id)
            .bind(data.paper_provided_by_party)
            .fetch_optional(executor)
            .await
    }

    /// Put a pending job on a machine's queue.
    pub async fn assign_to_machine<'e, E>(
        executor: E,
        id: Uuid,
        machine_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE job_sheets
             SET machine_id = $2,
                 job_status = 'assigned',
                 assigned_at = datetime('now', 'subsec'),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {JOB_SHEET_COLUMNS}"
        );
        sqlx::query_as::<_, JobSheet>(&sql)
            .bind(id)
            .bind(machine_id)
            .fetch_one(executor)
            .await
    }

    /// Move a job to `status`. `started_at` and `completed_at` are stamped the
    /// first time the job enters in_progress / completed and never overwritten.
    pub async fn update_status<'e, E>(
        executor: E,
        id: Uuid,
        status: JobStatus,
        operator_notes: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE job_sheets
             SET job_status = $2,
                 started_at = CASE
                     WHEN $2 = 'in_progress' AND started_at IS NULL THEN datetime('now', 'subsec')
                     ELSE started_at END,
                 completed_at = CASE
                     WHEN $2 = 'completed' AND completed_at IS NULL THEN datetime('now', 'subsec')
                     ELSE completed_at END,
                 operator_notes = COALESCE($3, operator_notes),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {JOB_SHEET_COLUMNS}"
        );
        sqlx::query_as::<_, JobSheet>(&sql)
            .bind(id)
            .bind(status)
            .bind(operator_notes)
            .fetch_one(executor)
            .await
    }

    /// Jobs on a machine that are assigned or running.
    pub async fn count_active_for_machine<'e, E>(executor: E, machine_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM job_sheets
             WHERE machine_id = $1
               AND is_deleted = 0
               AND job_status IN ('assigned', 'in_progress')",
        )
        .bind(machine_id)
        .fetch_one(executor)
        .await
    }

    /// See [`PartyTransaction::mark_deleted`](super::party_transaction::PartyTransaction::mark_deleted).
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
            "UPDATE job_sheets
             SET is_deleted = 1,
                 deletion_reason = $2,
                 deleted_by = $3,
                 deleted_at = datetime('now', 'subsec'),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND is_deleted = 0
             RETURNING {JOB_SHEET_COLUMNS}"
        );
        sqlx::query_as::<_, JobSheet>(&sql)
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
        let result = sqlx::query("DELETE FROM job_sheets WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
