use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::operator_notification::OperatorNotification;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::notifications::{NotificationFeed, NotificationService};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{Json, Query},
};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub machine_id: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize, TS)]
pub struct MarkNotificationRead {
    pub notification_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct MarkAllRead {
    pub machine_id: Option<Uuid>,
}

#[derive(Debug, Serialize, TS)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn get_notifications(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<NotificationQuery>,
) -> Result<ResponseJson<ApiResponse<NotificationFeed>>, ApiError> {
    let machine_id = query
        .machine_id
        .ok_or_else(|| ApiError::BadRequest("machine_id is required".into()))?;
    let feed = NotificationService::list(&deployment.db().pool, machine_id, query.unread_only).await?;
    Ok(ResponseJson(ApiResponse::success(feed)))
}

pub async fn mark_notification_read(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<MarkNotificationRead>,
) -> Result<ResponseJson<ApiResponse<OperatorNotification>>, ApiError> {
    let id = payload
        .notification_id
        .ok_or_else(|| ApiError::BadRequest("notification_id is required".into()))?;
    let notification = NotificationService::mark_read(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub async fn mark_all_notifications_read(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<MarkAllRead>,
) -> Result<ResponseJson<ApiResponse<MarkAllReadResponse>>, ApiError> {
    let machine_id = payload
        .machine_id
        .ok_or_else(|| ApiError::BadRequest("machine_id is required".into()))?;
    let updated = NotificationService::mark_all_read(&deployment.db().pool, machine_id).await?;
    Ok(ResponseJson(ApiResponse::success(MarkAllReadResponse { updated })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route(
        "/notifications",
        get(get_notifications)
            .put(mark_notification_read)
            .patch(mark_all_notifications_read),
    )
}
