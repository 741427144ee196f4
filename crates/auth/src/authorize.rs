//! Resource ownership check for handlers acting on email-keyed resources.

use craftowl_core::Email;

use crate::{AccessError, AuthenticatedSubject};

/// Require that the authenticated subject is the owner of the resource.
///
/// - No IO
/// - No panics
/// - Denies by default on mismatch
pub fn ensure_owner(subject: &AuthenticatedSubject, owner: &Email) -> Result<(), AccessError> {
    if subject.email() == owner {
        Ok(())
    } else {
        Err(AccessError::Forbidden(
            "authenticated subject does not own this resource".to_string(),
        ))
    }
}
