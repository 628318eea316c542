use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::dashboard::DashboardStats;
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_stats(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats =
        DashboardStats::fetch(&deployment.db().pool, deployment.config().low_stock_threshold).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/dashboard/stats", get(get_stats))
}
