use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use craftowl_auth::{GuardChain, RequestContext};

use crate::app::errors::ApiError;
use crate::context::CallerContext;

/// The guard chain a group of routes sits behind.
#[derive(Clone)]
pub struct GuardState {
    pub chain: Arc<GuardChain>,
}

impl GuardState {
    pub fn new(chain: GuardChain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }
}

/// Run the route's guard chain; on success the request continues with a
/// [`CallerContext`] in its extensions, on failure the handler never runs.
pub async fn guard_middleware(
    State(state): State<GuardState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::new(authorization_header(req.headers()));
    let ctx = state.chain.run(ctx).await?;

    if let Some(subject) = ctx.into_subject() {
        req.extensions_mut().insert(CallerContext::new(subject));
    }

    Ok(next.run(req).await)
}

fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
