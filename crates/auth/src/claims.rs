use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity token claims as they travel inside the signed token.
///
/// Timestamps are unix seconds, matching the registered `iat`/`exp` claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject: the user's email address.
    pub email: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate identity claims against `now`.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// `TokenCodec::verify` before this is called.
pub fn validate_claims(claims: &IdentityClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(now: DateTime<Utc>, ttl_secs: i64) -> IdentityClaims {
        IdentityClaims {
            email: "a@x.com".into(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl_secs,
        }
    }

    #[test]
    fn accepts_inside_window_and_rejects_at_expiry() {
        let now = Utc::now();
        let claims = claims_at(now, 60);
        assert_eq!(validate_claims(&claims, now), Ok(()));
        assert_eq!(
            validate_claims(&claims, now + Duration::seconds(60)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn rejects_future_and_inverted_windows() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(5), 60);
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::NotYetValid));

        let inverted = claims_at(now, 0);
        assert_eq!(
            validate_claims(&inverted, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
