use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::job_sheet::{CreateJobSheet, JobSheet, JobSheetFilter, UpdateJobSheet};
use deployment::Deployment;
use services::services::{
    job_assignment::{AssignJob, JobAssignmentService},
    job_sheets::JobSheetService,
    soft_delete::SoftDeleteRequest,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Path, Query},
};

pub async fn get_job_sheets(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<JobSheetFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<JobSheet>>>, ApiError> {
    let jobs = JobSheetService::list(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(jobs)))
}

pub async fn create_job_sheet(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateJobSheet>,
) -> Result<ResponseJson<ApiResponse<JobSheet>>, ApiError> {
    let job = JobSheetService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub async fn get_job_sheet(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<JobSheet>>, ApiError> {
    let job = JobSheetService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub async fn update_job_sheet(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobSheet>,
) -> Result<ResponseJson<ApiResponse<JobSheet>>, ApiError> {
    let job = JobSheetService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub async fn delete_job_sheet(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    JobSheetService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message((), "Job sheet deleted")))
}

pub async fn soft_delete_job_sheet(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SoftDeleteRequest>,
) -> Result<ResponseJson<ApiResponse<JobSheet>>, ApiError> {
    let job = JobSheetService::soft_delete(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub async fn assign_job_sheet(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignJob>,
) -> Result<ResponseJson<ApiResponse<JobSheet>>, ApiError> {
    let machine_id = payload
        .machine_id
        .ok_or_else(|| ApiError::BadRequest("machine_id is required".into()))?;
    let job = JobAssignmentService::assign(&deployment.db().pool, id, machine_id).await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/job-sheets",
        Router::new()
            .route("/", get(get_job_sheets).post(create_job_sheet))
            .route(
                "/{id}",
                get(get_job_sheet)
                    .patch(update_job_sheet)
                    .delete(delete_job_sheet),
            )
            .route("/{id}/soft-delete", patch(soft_delete_job_sheet))
            .route("/{id}/assign", post(assign_job_sheet)),
    )
}
