//! Operator dashboard: the job queue of one machine.

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::job_sheet::{JobSheet, JobStatus};
use deployment::Deployment;
use serde::Deserialize;
use services::services::job_assignment::{JobAssignmentService, JobStatusUpdate};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Query},
};

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub machine_id: Option<Uuid>,
    pub status: Option<JobStatus>,
}

pub async fn get_jobs(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<JobsQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<JobSheet>>>, ApiError> {
    let machine_id = query
        .machine_id
        .ok_or_else(|| ApiError::BadRequest("machine_id is required".into()))?;
    let jobs =
        JobAssignmentService::jobs_for_machine(&deployment.db().pool, machine_id, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(jobs)))
}

pub async fn update_job_status(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<JobStatusUpdate>,
) -> Result<ResponseJson<ApiResponse<JobSheet>>, ApiError> {
    let job = JobAssignmentService::update_status(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(job)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/jobs", get(get_jobs).put(update_job_status))
}
