use axum::http::StatusCode;

pub async fn root() -> &'static str {
    "Started"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
