//! `craftowl-auth`: identity tokens and the access guard chain.
//!
//! Guards read a transport-neutral `RequestContext`; user records come through
//! the `UserStore` port.

pub mod authorize;
pub mod claims;
pub mod guard;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::ensure_owner;
pub use claims::{IdentityClaims, TokenValidationError, validate_claims};
pub use guard::{
    Access, AccessError, AuthenticationGuard, Guard, GuardChain, RequestContext, RoleGuard,
};
pub use principal::AuthenticatedSubject;
pub use roles::Role;
pub use token::{IssuedToken, TokenCodec, TokenError, TokenFlow, TokenTtls};
pub use user::{User, UserStore};
