use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

pub type DeploymentImpl = deployment::PrintShopDeployment;

/// Full application router with state applied.
pub fn app(deployment: DeploymentImpl) -> Router {
    routes::router(&deployment)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}
