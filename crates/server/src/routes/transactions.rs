//! Party ledger endpoints.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, patch, put},
};
use db::models::party_transaction::{
    CreatePartyTransaction, PartyTransaction, TransactionFilter, UpdatePartyTransaction,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{ledger::LedgerService, soft_delete::SoftDeleteRequest};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Path, Query},
};

#[derive(Debug, Deserialize)]
pub struct TransactionIdQuery {
    pub id: Option<Uuid>,
}

pub async fn get_transactions(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<TransactionFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<PartyTransaction>>>, ApiError> {
    let rows = PartyTransaction::find(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(rows)))
}

pub async fn create_transaction(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreatePartyTransaction>,
) -> Result<ResponseJson<ApiResponse<PartyTransaction>>, ApiError> {
    let row = LedgerService::record(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(row)))
}

/// `DELETE /parties/transactions?id=`
pub async fn delete_transaction_by_query(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<TransactionIdQuery>,
) -> Result<ResponseJson<ApiResponse<PartyTransaction>>, ApiError> {
    let id = query
        .id
        .ok_or_else(|| ApiError::BadRequest("id is required".into()))?;
    let row = LedgerService::hard_delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(row, "Transaction deleted")))
}

pub async fn update_transaction(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePartyTransaction>,
) -> Result<ResponseJson<ApiResponse<PartyTransaction>>, ApiError> {
    let row = LedgerService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(row)))
}

pub async fn delete_transaction(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PartyTransaction>>, ApiError> {
    let row = LedgerService::hard_delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(row, "Transaction deleted")))
}

pub async fn soft_delete_transaction(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SoftDeleteRequest>,
) -> Result<ResponseJson<ApiResponse<PartyTransaction>>, ApiError> {
    let row = LedgerService::soft_delete(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        row,
        "Transaction deleted and balance reversed",
    )))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/parties/transactions",
            get(get_transactions)
                .post(create_transaction)
                .delete(delete_transaction_by_query),
        )
        .route(
            "/transactions/{id}",
            put(update_transaction).delete(delete_transaction),
        )
        .route("/transactions/{id}/soft-delete", patch(soft_delete_transaction))
}
