//! Public enquiry form plus the admin review endpoints.

use axum::{
    Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::quotation::{
    CreateQuotationRequest, QuotationRequest, QuotationStatus, UpdateQuotationRequest,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::quotations::QuotationService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Path, Query},
    middleware::rate_limit::limit_by_client,
};

#[derive(Debug, Deserialize)]
pub struct QuotationQuery {
    pub status: Option<QuotationStatus>,
}

pub async fn submit_quotation(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateQuotationRequest>,
) -> Result<ResponseJson<ApiResponse<QuotationRequest>>, ApiError> {
    let admin_email = deployment.config().mail.admin_notification_email.as_deref();
    let request = QuotationService::submit(&deployment.db().pool, &payload, admin_email).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        request,
        "Quotation request received",
    )))
}

pub async fn get_quotations(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<QuotationQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<QuotationRequest>>>, ApiError> {
    let requests = QuotationService::list(&deployment.db().pool, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(requests)))
}

pub async fn update_quotation(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuotationRequest>,
) -> Result<ResponseJson<ApiResponse<QuotationRequest>>, ApiError> {
    let request = QuotationService::update(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(request)))
}

/// Anonymous submissions, limited per client address.
pub fn public_router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/quotations", post(submit_quotation))
        .route_layer(from_fn_with_state(deployment.clone(), limit_by_client))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/quotations", get(get_quotations))
        .route("/quotations/{id}", patch(update_quotation))
}
