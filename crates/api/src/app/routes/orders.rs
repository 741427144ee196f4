//! Customer order endpoints. Every order operation here is scoped to the
//! authenticated caller.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;

use craftowl_auth::ensure_owner;
use craftowl_core::OrderId;
use craftowl_orders::{Order, PlaceOrder};

use crate::app::dto::{self, ConfirmPaymentRequest, OrderListQuery, PlaceOrderRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(body) = body?;
    if let Some(email) = &body.email {
        ensure_owner(caller.subject(), &dto::parse_email(email)?)?;
    }

    let order = services
        .orders
        .place(PlaceOrder {
            email: caller.email().clone(),
            tool_id: body.tool_id,
            quantity: body.quantity,
            details: body.details,
            occurred_at: Utc::now(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /order[?email=]`: the caller's orders; asking for anyone else's is forbidden.
pub async fn list_own_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    query: Result<Query<OrderListQuery>, QueryRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Query(query) = query?;
    if let Some(email) = &query.email {
        ensure_owner(caller.subject(), &dto::parse_email(email)?)?;
    }
    Ok(Json(services.orders.orders_for_owner(caller.email()).await?))
}

pub async fn get_own_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = dto::parse_id(&id)?;
    Ok(Json(services.orders.order_for_owner(id, caller.email()).await?))
}

/// `PATCH /order/:id`: record the processor's transaction reference.
pub async fn confirm_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = dto::parse_id(&id)?;
    let Json(body) = body?;
    let order = services
        .orders
        .confirm_payment(id, caller.email(), &body.transaction_id)
        .await?;
    Ok(Json(order))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: OrderId = dto::parse_id(&id)?;
    services.orders.cancel_own(id, caller.email()).await?;
    Ok(StatusCode::NO_CONTENT)
}
