use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use craftowl_auth::{AccessError, TokenError};
use craftowl_core::{DomainError, StoreError};
use craftowl_orders::{OrderError, PaymentError};

const UPSTREAM_MESSAGE: &str = "a backing service failed; try again later";

/// Every failure a handler or guard can surface, mapped onto HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// The message is logged, never returned.
    #[error("{0}")]
    UpstreamFailure(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Validation(_) => "validation_error",
            ApiError::UpstreamFailure(_) => "upstream_failure",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::UpstreamFailure(detail) => {
                tracing::error!(error = %detail, "upstream failure");
                UPSTREAM_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        json_error(self.status(), self.code(), message)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::Validation(msg),
            DomainError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::UpstreamFailure(err.to_string())
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => ApiError::Unauthenticated("authentication required".into()),
            AccessError::Forbidden(msg) => ApiError::Forbidden(msg),
            AccessError::Upstream(store) => store.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => ApiError::UpstreamFailure(format!("token signing: {msg}")),
            other => ApiError::Forbidden(other.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Rejected(msg) => ApiError::Validation(msg),
            PaymentError::Unavailable(msg) => ApiError::UpstreamFailure(format!("payment processor: {msg}")),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Domain(e) => e.into(),
            OrderError::Store(e) => e.into(),
            OrderError::Payment(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_their_status() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("order 1"), StatusCode::NOT_FOUND),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::forbidden("x"), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn guard_failures_split_401_and_403() {
        assert_eq!(ApiError::from(AccessError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AccessError::Forbidden("no".into())).code(),
            "forbidden"
        );
        assert_eq!(
            ApiError::from(AccessError::Upstream(StoreError::unavailable("db down"))).code(),
            "upstream_failure"
        );
    }

    #[tokio::test]
    async fn upstream_details_stay_out_of_the_body() {
        let response = ApiError::from(StoreError::unavailable("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "upstream_failure");
        assert!(!body["message"].as_str().unwrap().contains("hunter2"));
    }

    #[test]
    fn payment_rejection_is_a_client_error_and_outage_is_upstream() {
        assert_eq!(
            ApiError::from(OrderError::Payment(PaymentError::Rejected("too small".into()))).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(OrderError::Payment(PaymentError::Unavailable("timeout".into()))).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
