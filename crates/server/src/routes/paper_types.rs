use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::paper_type::{CreatePaperType, PaperType};
use deployment::Deployment;
use services::services::paper_types::PaperTypeService;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::Json};

pub async fn get_paper_types(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<PaperType>>>, ApiError> {
    let paper_types = PaperTypeService::list(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(paper_types)))
}

pub async fn create_paper_type(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreatePaperType>,
) -> Result<ResponseJson<ApiResponse<PaperType>>, ApiError> {
    let paper_type = PaperTypeService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(paper_type)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/paper-types", get(get_paper_types).post(create_paper_type))
}
