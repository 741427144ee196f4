use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use chrono::Utc;

use craftowl_catalog::{Review, SubmitReview};
use craftowl_core::InsertionOrder;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;

/// `PUT /review`: create or replace the caller's review.
pub async fn submit_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<SubmitReview>, JsonRejection>,
) -> Result<Json<Review>, ApiError> {
    let Json(cmd) = body?;
    let review = cmd.into_review(caller.email().clone(), Utc::now())?;
    Ok(Json(services.reviews.upsert(review).await?))
}

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(services.reviews.list(InsertionOrder::NewestFirst).await?))
}
