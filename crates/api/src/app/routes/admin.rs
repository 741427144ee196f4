//! Admin endpoints: role management and order fulfilment.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};

use craftowl_auth::{Role, User};
use craftowl_core::OrderId;
use craftowl_orders::Order;

use crate::app::dto::{self, AdminStatusResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;

/// `GET /admin/user/:email`: whether the user currently holds the admin role.
pub async fn admin_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    let email = dto::parse_email(&email)?;
    let admin = services
        .users
        .find(&email)
        .await?
        .is_some_and(|user| user.is_admin());
    Ok(Json(AdminStatusResponse { admin }))
}

pub async fn promote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(email): Path<String>,
) -> Result<Json<User>, ApiError> {
    set_role(&services, &caller, &email, Some(Role::Admin)).await
}

pub async fn revoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(email): Path<String>,
) -> Result<Json<User>, ApiError> {
    set_role(&services, &caller, &email, None).await
}

async fn set_role(
    services: &AppServices,
    caller: &CallerContext,
    email: &str,
    role: Option<Role>,
) -> Result<Json<User>, ApiError> {
    let email = dto::parse_email(email)?;
    let user = services
        .users
        .set_role(&email, role)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {email} not found")))?;

    tracing::info!(
        target_user = %email,
        by = %caller.email(),
        role = role.map(|r| r.as_str()).unwrap_or("none"),
        "user role changed"
    );
    Ok(Json(user))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(services.orders.all_orders().await?))
}

/// `PATCH /admin/order/:id`: mark a paid order shipped.
pub async fn ship_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = dto::parse_id(&id)?;
    Ok(Json(services.orders.ship(id).await?))
}

/// `DELETE /admin/order/:id`: remove an order that was never paid.
pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: OrderId = dto::parse_id(&id)?;
    services.orders.purge_unpaid(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
