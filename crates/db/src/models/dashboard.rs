use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct DashboardStats {
    pub total_parties: i64,
    /// Sum owed to the shop by parties with a negative balance.
    pub total_receivable: f64,
    /// Sum of advances held for parties with a positive balance.
    pub total_advance: f64,
    pub total_job_sheets: i64,
    pub jobs_this_month: i64,
    pub revenue_this_month: f64,
    pub pending_jobs: i64,
    pub jobs_in_progress: i64,
    pub active_machines: i64,
    pub pending_quotations: i64,
    pub low_stock_items: i64,
}

impl DashboardStats {
    pub async fn fetch(pool: &SqlitePool, low_stock_threshold: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DashboardStats>(
            "SELECT
                (SELECT COUNT(*) FROM parties) AS total_parties,
                (SELECT TOTAL(-balance) FROM parties WHERE balance < 0) AS total_receivable,
                (SELECT TOTAL(balance) FROM parties WHERE balance > 0) AS total_advance,
                (SELECT COUNT(*) FROM job_sheets WHERE is_deleted = 0) AS total_job_sheets,
                (SELECT COUNT(*) FROM job_sheets
                  WHERE is_deleted = 0
                    AND strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')) AS jobs_this_month,
                (SELECT TOTAL(printing + uv + baking) FROM job_sheets
                  WHERE is_deleted = 0
                    AND job_status != 'cancelled'
                    AND strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')) AS revenue_this_month,
                (SELECT COUNT(*) FROM job_sheets
                  WHERE is_deleted = 0 AND job_status IN ('pending', 'assigned')) AS pending_jobs,
                (SELECT COUNT(*) FROM job_sheets
                  WHERE is_deleted = 0 AND job_status = 'in_progress') AS jobs_in_progress,
                (SELECT COUNT(*) FROM machines WHERE status = 'active') AS active_machines,
                (SELECT COUNT(*) FROM quotation_requests WHERE status = 'pending') AS pending_quotations,
                (SELECT COUNT(*) FROM inventory_items
                  WHERE current_quantity - reserved_quantity < $1) AS low_stock_items",
        )
        .bind(low_stock_threshold)
        .fetch_one(pool)
        .await
    }
}
