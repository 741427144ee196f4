//! Payment-processor port.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use craftowl_core::Price;

/// A payment intent minted by the processor; the storefront completes the
/// card payment with `client_secret` and reports the resulting transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    /// Amount in minor units, as sent to the processor.
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment processor rejected the request: {0}")]
    Rejected(String),

    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a card payment intent for `amount` (sent as minor units).
    async fn create_intent(&self, amount: Price) -> Result<PaymentIntent, PaymentError>;
}
