use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};

use craftowl_orders::PaymentIntent;

use crate::app::dto::PaymentIntentRequest;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// `POST /create-payment-intent`: `{price}` in major units, answered with the
/// processor's client secret and the amount in minor units.
pub async fn create_payment_intent(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<PaymentIntentRequest>, JsonRejection>,
) -> Result<Json<PaymentIntent>, ApiError> {
    let Json(body) = body?;
    Ok(Json(services.orders.start_payment(body.price).await?))
}
