use chrono::{DateTime, Utc};
use serde::Serialize;

use craftowl_core::Email;

/// Identity of an authenticated caller, as decoded from a verified token.
///
/// Carries no role: roles are read from the user record on every admin-gated
/// request so a promotion or revocation applies on the very next call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedSubject {
    pub email: Email,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedSubject {
    pub fn email(&self) -> &Email {
        &self.email
    }
}
