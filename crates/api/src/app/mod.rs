//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, payment gateway, token codec, lifecycle manager
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and path parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router around already-wired services.
pub fn build_app(services: Arc<AppServices>) -> Router {
    routes::router(&services).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(Extension(services)),
    )
}

/// Wire services from configuration and build the router (entrypoint used by `main.rs`).
pub async fn build_app_from_config(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = AppServices::from_config(config).await?;
    Ok(build_app(Arc::new(services)))
}
