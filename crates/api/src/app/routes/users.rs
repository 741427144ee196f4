//! User endpoints: signup/login token issue, profile self-update, reads.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
};
use chrono::Utc;
use serde_json::{Map, Value};

use craftowl_auth::{TokenFlow, User, ensure_owner};

use crate::app::dto::{self, SignupResponse, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;

/// `PUT /user/:email`: create the user on first contact and hand out a
/// short-lived signup token.
pub async fn upsert_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<SignupResponse>, ApiError> {
    let email = dto::parse_email(&email)?;
    let user = services.users.upsert(&email).await?;
    let issued = services.codec.issue(&email, TokenFlow::Signup, Utc::now())?;

    tracing::info!(email = %email, "user upserted; signup token issued");
    Ok(Json(SignupResponse {
        result: user,
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// `POST /login/:email`: session token for an existing user.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = dto::parse_email(&email)?;
    if services.users.find(&email).await?.is_none() {
        return Err(ApiError::not_found(format!("user {email} not found")));
    }
    let issued = services.codec.issue(&email, TokenFlow::Session, Utc::now())?;

    tracing::info!(email = %email, "session token issued");
    Ok(Json(issued.into()))
}

/// `PATCH /update-user/:email`: merge profile fields into the caller's own record.
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(email): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let email = dto::parse_email(&email)?;
    ensure_owner(caller.subject(), &email)?;
    let Json(profile) = body?;

    let user = services.users.merge_profile(&email, profile).await?;
    Ok(Json(user))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<User>, ApiError> {
    let email = dto::parse_email(&email)?;
    services
        .users
        .find(&email)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("user {email} not found")))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(services.users.list().await?))
}
