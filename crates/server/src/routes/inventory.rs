use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::inventory::{
    CreateInventoryTransaction, InventoryItem, InventoryItemDetails, InventoryTransaction,
    InventoryTransactionFilter,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{inventory::InventoryService, soft_delete::SoftDeleteRequest};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Path, Query},
};

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub party_id: Option<Uuid>,
}

pub async fn get_inventory(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<InventoryQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<InventoryItemDetails>>>, ApiError> {
    let items = InventoryService::list_items(&deployment.db().pool, query.party_id).await?;
    Ok(ResponseJson(ApiResponse::success(items)))
}

pub async fn record_movement(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateInventoryTransaction>,
) -> Result<ResponseJson<ApiResponse<InventoryTransaction>>, ApiError> {
    let movement = InventoryService::record_movement(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(movement)))
}

pub async fn get_movements(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<InventoryTransactionFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<InventoryTransaction>>>, ApiError> {
    let movements = InventoryService::list_movements(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(movements)))
}

pub async fn soft_delete_movement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SoftDeleteRequest>,
) -> Result<ResponseJson<ApiResponse<InventoryTransaction>>, ApiError> {
    let movement = InventoryService::soft_delete_movement(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        movement,
        "Movement deleted and stock recomputed",
    )))
}

pub async fn recompute_item(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InventoryItem>>, ApiError> {
    let item = InventoryService::recompute(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(item)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/inventory",
        Router::new()
            .route("/", get(get_inventory).post(record_movement))
            .route("/transactions", get(get_movements))
            .route("/transactions/{id}/soft-delete", patch(soft_delete_movement))
            .route("/{id}/recompute", post(recompute_item)),
    )
}
