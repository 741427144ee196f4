//! Process configuration, read once at startup.
//!
//! Values come from a lookup function so tests can feed a map instead of
//! mutating the process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::Duration as TokenDuration;
use secrecy::SecretString;
use thiserror::Error;

use craftowl_auth::TokenTtls;
use craftowl_infra::StripeConfig;
use craftowl_infra::payment::stripe::DEFAULT_API_BASE;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub token_secret: SecretString,
    pub token_ttls: TokenTtls,
    /// PostgreSQL connection string; in-memory store when absent.
    pub database_url: Option<SecretString>,
    /// Stripe settings; in-memory gateway when absent.
    pub stripe: Option<StripeConfig>,
    pub payment_currency: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse_or(&get, "BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(&get, "PORT", 5000u16)?;

        let token_secret = get("ACCESS_TOKEN_SECRET")
            .map(SecretString::from)
            .ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;

        let token_ttls = TokenTtls {
            signup: ttl(&get, "SIGNUP_TOKEN_TTL_SECS", 3600)?,
            session: ttl(&get, "SESSION_TOKEN_TTL_SECS", 86_400)?,
        };

        let payment_currency = get("PAYMENT_CURRENCY")
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or_else(|| "usd".to_string());

        let stripe = match get("STRIPE_SECRET_KEY") {
            Some(key) => {
                let timeout_secs = parse_or(&get, "PAYMENT_TIMEOUT_SECS", 10u64)?;
                Some(StripeConfig {
                    secret_key: SecretString::from(key),
                    api_base: get("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                    currency: payment_currency.clone(),
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            None => None,
        };

        Ok(Self {
            bind_addr,
            port,
            token_secret,
            token_ttls,
            database_url: get("DATABASE_URL").map(SecretString::from),
            stripe,
            payment_currency,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Longest token lifetime accepted from configuration (one year).
const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 60 * 60;

fn ttl(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default_secs: i64,
) -> Result<TokenDuration, ConfigError> {
    let secs = parse_or(get, key, default_secs)?;
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
        });
    }
    TokenDuration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
        key,
        reason: "out of range".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    fn config(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = config(&[("ACCESS_TOKEN_SECRET", "s3cret")]).unwrap();

        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:5000");
        assert_eq!(cfg.token_secret.expose_secret(), "s3cret");
        assert_eq!(cfg.token_ttls, TokenTtls::default());
        assert!(cfg.database_url.is_none());
        assert!(cfg.stripe.is_none());
        assert_eq!(cfg.payment_currency, "usd");
    }

    #[test]
    fn missing_or_blank_secret_is_an_error() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("ACCESS_TOKEN_SECRET"));
        assert_eq!(
            config(&[("ACCESS_TOKEN_SECRET", "  ")]).unwrap_err(),
            ConfigError::Missing("ACCESS_TOKEN_SECRET")
        );
    }

    #[test]
    fn stripe_settings_follow_the_secret_key() {
        let cfg = config(&[
            ("ACCESS_TOKEN_SECRET", "s"),
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("PAYMENT_CURRENCY", "EUR"),
            ("PAYMENT_TIMEOUT_SECS", "3"),
        ])
        .unwrap();

        let stripe = cfg.stripe.unwrap();
        assert_eq!(stripe.api_base, DEFAULT_API_BASE);
        assert_eq!(stripe.currency, "eur");
        assert_eq!(stripe.timeout, Duration::from_secs(3));
    }

    #[test]
    fn bad_numbers_are_rejected_with_their_key() {
        assert!(matches!(
            config(&[("ACCESS_TOKEN_SECRET", "s"), ("PORT", "http")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("ACCESS_TOKEN_SECRET", "s"), ("SESSION_TOKEN_TTL_SECS", "0")]),
            Err(ConfigError::Invalid { key: "SESSION_TOKEN_TTL_SECS", .. })
        ));
    }

    #[test]
    fn oversized_ttls_are_rejected() {
        let max = i64::MAX.to_string();
        for value in [max.as_str(), "9000000000000000", "31622401"] {
            assert!(matches!(
                config(&[("ACCESS_TOKEN_SECRET", "s"), ("SIGNUP_TOKEN_TTL_SECS", value)]),
                Err(ConfigError::Invalid { key: "SIGNUP_TOKEN_TTL_SECS", .. })
            ));
        }

        let cfg = config(&[("ACCESS_TOKEN_SECRET", "s"), ("SESSION_TOKEN_TTL_SECS", "31622400")]).unwrap();
        assert_eq!(cfg.token_ttls.session, TokenDuration::days(366));
    }

    #[test]
    fn custom_ttls_and_bind_address() {
        let cfg = config(&[
            ("ACCESS_TOKEN_SECRET", "s"),
            ("BIND_ADDR", "127.0.0.1"),
            ("PORT", "8080"),
            ("SIGNUP_TOKEN_TTL_SECS", "60"),
        ])
        .unwrap();

        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.token_ttls.signup, TokenDuration::seconds(60));
        assert_eq!(cfg.token_ttls.session, TokenDuration::days(1));
    }
}
