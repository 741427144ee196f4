//! Catalog endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;

use craftowl_catalog::{CreateTool, TOP_TOOLS_LIMIT, Tool, ToolQuery};
use craftowl_core::ToolId;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;

/// `GET /tool`: the storefront's newest tools.
pub async fn top_tools(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Tool>>, ApiError> {
    Ok(Json(services.tools.query(ToolQuery::top(TOP_TOOLS_LIMIT)).await?))
}

pub async fn all_tools(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Tool>>, ApiError> {
    Ok(Json(services.tools.query(ToolQuery::all()).await?))
}

pub async fn cheapest_tool(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Tool>, ApiError> {
    services
        .tools
        .query(ToolQuery::cheapest())
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("the catalog is empty"))
}

pub async fn get_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Tool>, ApiError> {
    let id: ToolId = dto::parse_id(&id)?;
    services
        .tools
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("tool {id} not found")))
}

pub async fn create_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<CreateTool>, JsonRejection>,
) -> Result<(StatusCode, Json<Tool>), ApiError> {
    let Json(cmd) = body?;
    let tool = services.tools.insert(cmd.into_tool(Utc::now())?).await?;

    tracing::info!(tool_id = %tool.id, by = %caller.email(), "tool created");
    Ok((StatusCode::CREATED, Json(tool)))
}

pub async fn delete_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ToolId = dto::parse_id(&id)?;
    if !services.tools.delete(id).await? {
        return Err(ApiError::not_found(format!("tool {id} not found")));
    }

    tracing::info!(tool_id = %id, by = %caller.email(), "tool deleted");
    Ok(StatusCode::NO_CONTENT)
}
