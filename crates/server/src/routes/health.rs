use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use services::services::database_validator::{DatabaseValidator, SchemaStatus};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<SchemaStatus>>, ApiError> {
    let status = DatabaseValidator::status(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(status, "OK")))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/health", get(health_check))
}
