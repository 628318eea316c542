use axum::{Router, middleware::from_fn_with_state};

use crate::{
    DeploymentImpl,
    middleware::auth::{require_admin, require_worker_secret},
};

pub mod auth;
pub mod dashboard;
pub mod email_worker;
pub mod health;
pub mod inventory;
pub mod job_sheets;
pub mod jobs;
pub mod machines;
pub mod notifications;
pub mod paper_types;
pub mod parties;
pub mod quotations;
pub mod transactions;

/// Every route, grouped by who may call it.
pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let public = Router::new()
        .merge(health::router(deployment))
        .merge(auth::public_router(deployment))
        .merge(quotations::public_router(deployment));

    let operator = Router::new()
        .merge(jobs::router(deployment))
        .merge(notifications::router(deployment));

    let worker = Router::new()
        .merge(email_worker::router(deployment))
        .merge(auth::worker_router(deployment))
        .route_layer(from_fn_with_state(deployment.clone(), require_worker_secret));

    let admin = Router::new()
        .merge(parties::router(deployment))
        .merge(transactions::router(deployment))
        .merge(job_sheets::router(deployment))
        .merge(paper_types::router(deployment))
        .merge(inventory::router(deployment))
        .merge(machines::router(deployment))
        .merge(quotations::router(deployment))
        .merge(dashboard::router(deployment))
        .route_layer(from_fn_with_state(deployment.clone(), require_admin));

    Router::new()
        .merge(public)
        .merge(operator)
        .merge(worker)
        .merge(admin)
}
