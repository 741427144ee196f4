use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use craftowl_auth::{IssuedToken, User};
use craftowl_core::{Email, Price};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Optional; when given it must be the caller's own email.
    pub email: Option<String>,
    pub tool_id: String,
    pub quantity: u32,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: Price,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub email: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub result: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub admin: bool,
}

// -------------------------
// Path helpers
// -------------------------

pub fn parse_email(raw: &str) -> Result<Email, ApiError> {
    Ok(Email::parse(raw)?)
}

pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: core::str::FromStr<Err = craftowl_core::DomainError>,
{
    Ok(raw.parse()?)
}
