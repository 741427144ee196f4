//! Identity token codec (HS256 JWT).
//!
//! Tokens are stateless: nothing is persisted server-side, and verification is
//! a pure function of the token, the signing secret and the supplied `now`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use craftowl_core::Email;

use crate::claims::{IdentityClaims, TokenValidationError, validate_claims};
use crate::principal::AuthenticatedSubject;

/// Which issuing flow a token belongs to; each flow has its own TTL.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenFlow {
    /// Issued by the user upsert on first contact (`PUT /user/:email`).
    Signup,
    /// Issued by an explicit login of an existing user.
    Session,
}

/// Token lifetimes per flow.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenTtls {
    pub signup: Duration,
    pub session: Duration,
}

impl TokenTtls {
    pub fn for_flow(&self, flow: TokenFlow) -> Duration {
        match flow {
            TokenFlow::Signup => self.signup,
            TokenFlow::Session => self.session,
        }
    }
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            signup: Duration::hours(1),
            session: Duration::days(1),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature or claims are invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => TokenError::Expired,
            TokenValidationError::NotYetValid | TokenValidationError::InvalidTimeWindow => {
                TokenError::Invalid
            }
        }
    }
}

/// A freshly signed token plus its expiry, for the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies identity tokens with a process-wide secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttls: TokenTtls,
}

impl TokenCodec {
    pub fn new(secret: &SecretString, ttls: TokenTtls) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttls,
        }
    }

    pub fn issue(
        &self,
        subject: &Email,
        flow: TokenFlow,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttls.for_flow(flow))
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".into()))?;
        let claims = IdentityClaims {
            email: subject.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthenticatedSubject, TokenError> {
        // Expiry is checked against the caller's `now` below, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        let claims = data.claims;
        validate_claims(&claims, now)?;

        let email = Email::parse(&claims.email).map_err(|_| TokenError::Malformed)?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;

        Ok(AuthenticatedSubject {
            email,
            issued_at,
            expires_at,
        })
    }
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("ttls", &self.ttls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-token-testing";

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&SecretString::from(secret.to_string()), TokenTtls::default())
    }

    fn alice() -> Email {
        Email::parse("alice@example.com").unwrap()
    }

    #[test]
    fn issued_token_verifies_before_expiry() {
        let codec = codec(TEST_SECRET);
        let now = Utc::now();
        let issued = codec.issue(&alice(), TokenFlow::Signup, now).unwrap();

        let subject = codec.verify(&issued.token, now + Duration::minutes(59)).unwrap();
        assert_eq!(subject.email, alice());
        assert_eq!(subject.expires_at.timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn token_is_rejected_after_its_flow_ttl() {
        let codec = codec(TEST_SECRET);
        let now = Utc::now();

        let signup = codec.issue(&alice(), TokenFlow::Signup, now).unwrap();
        assert_eq!(
            codec.verify(&signup.token, now + Duration::hours(1)),
            Err(TokenError::Expired)
        );

        let session = codec.issue(&alice(), TokenFlow::Session, now).unwrap();
        assert!(codec.verify(&session.token, now + Duration::hours(23)).is_ok());
        assert_eq!(
            codec.verify(&session.token, now + Duration::days(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let now = Utc::now();
        let foreign = codec("another-secret-entirely")
            .issue(&alice(), TokenFlow::Session, now)
            .unwrap();

        assert_eq!(codec(TEST_SECRET).verify(&foreign.token, now), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec(TEST_SECRET);
        let now = Utc::now();
        assert_eq!(codec.verify("not-a-token", now), Err(TokenError::Malformed));
        assert_eq!(codec.verify("", now), Err(TokenError::Malformed));
    }

    #[test]
    fn expiry_overflow_is_an_error() {
        let ttls = TokenTtls {
            signup: Duration::seconds(9_000_000_000_000_000),
            session: Duration::days(1),
        };
        let codec = TokenCodec::new(&SecretString::from(TEST_SECRET.to_string()), ttls);

        assert!(matches!(
            codec.issue(&alice(), TokenFlow::Signup, Utc::now()),
            Err(TokenError::Signing(_))
        ));
        assert!(codec.issue(&alice(), TokenFlow::Session, Utc::now()).is_ok());
    }

    #[test]
    fn debug_output_never_contains_secret() {
        let rendered = format!("{:?}", codec(TEST_SECRET));
        assert!(!rendered.contains(TEST_SECRET));
        assert!(rendered.contains("REDACTED"));
    }
}
