use craftowl_auth::AuthenticatedSubject;
use craftowl_core::Email;

/// Caller identity for a request that passed an authenticating guard chain.
///
/// Inserted into request extensions by the guard middleware; public routes
/// never see one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    subject: AuthenticatedSubject,
}

impl CallerContext {
    pub fn new(subject: AuthenticatedSubject) -> Self {
        Self { subject }
    }

    pub fn email(&self) -> &Email {
        self.subject.email()
    }

    pub fn subject(&self) -> &AuthenticatedSubject {
        &self.subject
    }
}
