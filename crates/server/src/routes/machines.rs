use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::machine::{CreateMachine, Machine, MachineWithWorkload, UpdateMachine};
use deployment::Deployment;
use serde::Deserialize;
use services::services::machines::MachineService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Query},
};

#[derive(Debug, Deserialize)]
pub struct MachineIdQuery {
    pub id: Option<Uuid>,
}

pub async fn get_machines(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<MachineWithWorkload>>>, ApiError> {
    let machines = MachineService::list(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(machines)))
}

pub async fn create_machine(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateMachine>,
) -> Result<ResponseJson<ApiResponse<Machine>>, ApiError> {
    let machine = MachineService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(machine)))
}

/// The machine id travels in the body.
pub async fn update_machine(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateMachine>,
) -> Result<ResponseJson<ApiResponse<Machine>>, ApiError> {
    let machine = MachineService::update(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(machine)))
}

pub async fn delete_machine(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<MachineIdQuery>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let id = query
        .id
        .ok_or_else(|| ApiError::BadRequest("id is required".into()))?;
    MachineService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message((), "Machine deleted")))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route(
        "/machines",
        get(get_machines)
            .post(create_machine)
            .put(update_machine)
            .delete(delete_machine),
    )
}
