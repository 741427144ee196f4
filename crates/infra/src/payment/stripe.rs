//! Stripe payment-intent adapter.
//!
//! Talks to the `/v1/payment_intents` REST endpoint directly: form-encoded
//! request, bearer secret key, JSON response.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use craftowl_core::Price;
use craftowl_orders::{PaymentError, PaymentGateway, PaymentIntent};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub api_base: String,
    /// ISO currency code, lower case.
    pub currency: String,
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            api_base: DEFAULT_API_BASE.to_string(),
            currency: "usd".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self), fields(amount = amount.minor_units()), err)]
    async fn create_intent(&self, amount: Price) -> Result<PaymentIntent, PaymentError> {
        let minor = amount.minor_units();
        let form = [
            ("amount", minor.to_string()),
            ("currency", self.config.currency.clone()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let response = self
            .http
            .post(self.config.intents_url())
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(if status.is_server_error() {
                PaymentError::Unavailable(message)
            } else {
                PaymentError::Rejected(message)
            });
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Unavailable(format!("unreadable intent response: {e}")))?;

        Ok(PaymentIntent {
            client_secret: body.client_secret,
            amount: minor,
            currency: self.config.currency.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn accept(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth != "Bearer sk_test_123" {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": { "message": "bad key" } })));
        }
        assert_eq!(form.get("payment_method_types[]").map(String::as_str), Some("card"));
        let amount = form.get("amount").cloned().unwrap_or_default();
        (
            StatusCode::OK,
            Json(json!({ "id": "pi_1", "client_secret": format!("pi_1_secret_{amount}_{}", form["currency"]) })),
        )
    }

    async fn decline() -> (StatusCode, Json<Value>) {
        (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({ "error": { "message": "Amount must be at least $0.50 usd" } })),
        )
    }

    async fn outage() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn spawn_processor() -> String {
        let app = Router::new()
            .route("/ok/v1/payment_intents", post(accept))
            .route("/declined/v1/payment_intents", post(decline))
            .route("/down/v1/payment_intents", post(outage));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn gateway(base: String, key: &str) -> StripeGateway {
        let mut config = StripeConfig::new(SecretString::from(key.to_string()));
        config.api_base = base;
        StripeGateway::new(config).unwrap()
    }

    #[tokio::test]
    async fn creates_intent_for_amount_in_minor_units() {
        let base = spawn_processor().await;
        let intent = gateway(format!("{base}/ok/"), "sk_test_123")
            .create_intent(Price::from_minor_units(2500))
            .await
            .unwrap();

        assert_eq!(intent.amount, 2500);
        assert_eq!(intent.currency, "usd");
        assert_eq!(intent.client_secret, "pi_1_secret_2500_usd");
    }

    #[tokio::test]
    async fn client_errors_are_rejections_with_processor_message() {
        let base = spawn_processor().await;
        let err = gateway(format!("{base}/declined"), "sk_test_123")
            .create_intent(Price::from_minor_units(10))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::Rejected("Amount must be at least $0.50 usd".into()));

        let err = gateway(format!("{base}/ok"), "sk_wrong")
            .create_intent(Price::from_minor_units(2500))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::Rejected("bad key".into()));
    }

    #[tokio::test]
    async fn server_errors_and_unreachable_processor_are_unavailable() {
        let base = spawn_processor().await;
        let err = gateway(format!("{base}/down"), "sk_test_123")
            .create_intent(Price::from_minor_units(2500))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Unavailable(_)));

        let err = gateway("http://127.0.0.1:1".into(), "sk_test_123")
            .create_intent(Price::from_minor_units(2500))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Unavailable(_)));
    }

    #[test]
    fn debug_output_hides_secret_key() {
        let config = StripeConfig::new(SecretString::from("sk_live_secret".to_string()));
        assert!(!format!("{config:?}").contains("sk_live_secret"));
    }
}
