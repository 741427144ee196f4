//! Access guard chain.
//!
//! Guards are run in order by [`GuardChain::run`]; the first failure aborts the
//! chain, so a handler behind it never executes (and never writes) unless every
//! guard passed. The context value threads the authenticated subject forward.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use craftowl_core::StoreError;

use crate::principal::AuthenticatedSubject;
use crate::token::TokenCodec;
use crate::user::UserStore;

/// Per-request state seen by guards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    authorization: Option<String>,
    subject: Option<AuthenticatedSubject>,
}

impl RequestContext {
    /// Build a context from the raw `Authorization` header value, if any.
    pub fn new(authorization: Option<String>) -> Self {
        Self {
            authorization,
            subject: None,
        }
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn subject(&self) -> Option<&AuthenticatedSubject> {
        self.subject.as_ref()
    }

    pub fn into_subject(self) -> Option<AuthenticatedSubject> {
        self.subject
    }

    fn attach_subject(&mut self, subject: AuthenticatedSubject) {
        self.subject = Some(subject);
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("role lookup failed: {0}")]
    Upstream(#[from] StoreError),
}

impl AccessError {
    fn forbidden(reason: &str) -> Self {
        Self::Forbidden(reason.to_string())
    }
}

/// A single access check.
#[async_trait]
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, ctx: &mut RequestContext) -> Result<(), AccessError>;
}

/// Guard requirement declared by a route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Ordered list of guards run by a generic executor.
#[derive(Clone, Default)]
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Standard chain for a route's declared access level.
    pub fn for_access(access: Access, codec: Arc<TokenCodec>, users: Arc<dyn UserStore>) -> Self {
        match access {
            Access::Public => Self::new(),
            Access::Authenticated => Self::new().with(AuthenticationGuard::new(codec)),
            Access::Admin => Self::new()
                .with(AuthenticationGuard::new(codec))
                .with(RoleGuard::new(users)),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext, AccessError> {
        for guard in &self.guards {
            if let Err(err) = guard.check(&mut ctx).await {
                tracing::debug!(guard = guard.name(), error = %err, "guard rejected request");
                return Err(err);
            }
        }
        Ok(ctx)
    }
}

impl core::fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Requires a valid bearer token and attaches its subject.
pub struct AuthenticationGuard {
    codec: Arc<TokenCodec>,
    clock: fn() -> DateTime<Utc>,
}

impl AuthenticationGuard {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock (tests).
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl Guard for AuthenticationGuard {
    fn name(&self) -> &'static str {
        "authentication"
    }

    async fn check(&self, ctx: &mut RequestContext) -> Result<(), AccessError> {
        let header = ctx.authorization().ok_or(AccessError::Unauthenticated)?;
        let token = bearer_token(header).ok_or_else(|| AccessError::forbidden("malformed bearer credential"))?;

        let subject = self
            .codec
            .verify(token, (self.clock)())
            .map_err(|e| AccessError::Forbidden(e.to_string()))?;

        ctx.attach_subject(subject);
        Ok(())
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Requires the authenticated subject to currently hold the admin role.
///
/// The user record is re-read on every call; nothing is cached.
pub struct RoleGuard {
    users: Arc<dyn UserStore>,
}

impl RoleGuard {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Guard for RoleGuard {
    fn name(&self) -> &'static str {
        "admin-role"
    }

    async fn check(&self, ctx: &mut RequestContext) -> Result<(), AccessError> {
        let subject = ctx.subject().ok_or(AccessError::Unauthenticated)?;

        match self.users.find(subject.email()).await? {
            Some(user) if user.is_admin() => Ok(()),
            Some(_) => Err(AccessError::forbidden("admin role required")),
            None => Err(AccessError::forbidden("unknown user")),
        }
    }
}
