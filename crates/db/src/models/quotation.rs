use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const QUOTATION_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, company_name, \
    job_description, quantity, paper_details, size, notes, status, quoted_amount, created_at, updated_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "quotation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuotationStatus {
    #[default]
    Pending,
    Quoted,
    Accepted,
    Rejected,
}

/// Price enquiry submitted from the public website.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct QuotationRequest {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub company_name: Option<String>,
    pub job_description: String,
    pub quantity: Option<i64>,
    pub paper_details: Option<String>,
    pub size: Option<String>,
    pub notes: Option<String>,
    pub status: QuotationStatus,
    pub quoted_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateQuotationRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub company_name: Option<String>,
    pub job_description: Option<String>,
    pub quantity: Option<i64>,
    pub paper_details: Option<String>,
    pub size: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateQuotationRequest {
    pub status: Option<QuotationStatus>,
    pub quoted_amount: Option<f64>,
    pub notes: Option<String>,
}

impl QuotationRequest {
    pub async fn find_all(
        pool: &SqlitePool,
        status: Option<QuotationStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotation_requests
             WHERE ($1 IS NULL OR status = $1)
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, QuotationRequest>(&sql)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {QUOTATION_COLUMNS} FROM quotation_requests WHERE id = $1");
        sqlx::query_as::<_, QuotationRequest>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert an already validated request; `customer_name` and
    /// `job_description` are passed trimmed.
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        customer_name: &str,
        job_description: &str,
        data: &CreateQuotationRequest,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "INSERT INTO quotation_requests
                (id, customer_name, customer_email, customer_phone, company_name, job_description,
                 quantity, paper_details, size, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {QUOTATION_COLUMNS}"
        );
        sqlx::query_as::<_, QuotationRequest>(&sql)
            .bind(id)
            .bind(customer_name)
            .bind(&data.customer_email)
            .bind(&data.customer_phone)
            .bind(&data.company_name)
            .bind(job_description)
            .bind(data.quantity)
            .bind(&data.paper_details)
            .bind(&data.size)
            .bind(&data.notes)
            .fetch_one(executor)
            .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateQuotationRequest,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "UPDATE quotation_requests
             SET status = COALESCE($2, status),
                 quoted_amount = COALESCE($3, quoted_amount),
                 notes = COALESCE($4, notes),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {QUOTATION_COLUMNS}"
        );
        sqlx::query_as::<_, QuotationRequest>(&sql)
            .bind(id)
            .bind(data.status)
            .bind(data.quoted_amount)
            .bind(&data.notes)
            .fetch_optional(executor)
            .await
    }
}
