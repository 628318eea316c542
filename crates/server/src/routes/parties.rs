use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::party::{CreateParty, Party, UpdateParty};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{ledger::LedgerService, parties::PartyService};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Path, Query},
};

#[derive(Debug, Deserialize)]
pub struct PartySearch {
    pub search: Option<String>,
}

pub async fn get_parties(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<PartySearch>,
) -> Result<ResponseJson<ApiResponse<Vec<Party>>>, ApiError> {
    let parties = PartyService::list(&deployment.db().pool, query.search.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(parties)))
}

pub async fn create_party(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateParty>,
) -> Result<ResponseJson<ApiResponse<Party>>, ApiError> {
    let party = PartyService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(party)))
}

pub async fn get_party(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Party>>, ApiError> {
    let party = PartyService::get(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(party)))
}

pub async fn update_party(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateParty>,
) -> Result<ResponseJson<ApiResponse<Party>>, ApiError> {
    let party = PartyService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(party)))
}

pub async fn delete_party(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    PartyService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message((), "Party deleted")))
}

/// Rebuild balance and totals from the live ledger rows.
pub async fn recompute_party(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Party>>, ApiError> {
    let party = LedgerService::recompute(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(party)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/parties",
        Router::new()
            .route("/", get(get_parties).post(create_party))
            .route("/{id}", get(get_party).put(update_party).delete(delete_party))
            .route("/{id}/recompute", post(recompute_party)),
    )
}
