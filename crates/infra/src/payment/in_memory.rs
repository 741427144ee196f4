use std::sync::Mutex;

use async_trait::async_trait;

use craftowl_core::Price;
use craftowl_orders::{PaymentError, PaymentGateway, PaymentIntent};

/// Payment gateway that never leaves the process. Mints deterministic client
/// secrets and remembers every requested amount.
#[derive(Debug)]
pub struct InMemoryPaymentGateway {
    currency: String,
    amounts: Mutex<Vec<u64>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::with_currency("usd")
    }

    pub fn with_currency(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            amounts: Mutex::new(Vec::new()),
        }
    }

    /// Amounts (minor units) of every intent created so far.
    pub fn recorded_amounts(&self) -> Vec<u64> {
        self.amounts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(&self, amount: Price) -> Result<PaymentIntent, PaymentError> {
        let mut amounts = self
            .amounts
            .lock()
            .map_err(|_| PaymentError::Unavailable("gateway lock poisoned".into()))?;
        amounts.push(amount.minor_units());

        Ok(PaymentIntent {
            client_secret: format!("pi_local_{}_secret_{}", amounts.len(), amount.minor_units()),
            amount: amount.minor_units(),
            currency: self.currency.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_each_intent() {
        let gateway = InMemoryPaymentGateway::with_currency("eur");
        let first = gateway.create_intent(Price::from_minor_units(2500)).await.unwrap();
        let second = gateway.create_intent(Price::from_minor_units(99)).await.unwrap();

        assert_eq!(first.currency, "eur");
        assert_ne!(first.client_secret, second.client_secret);
        assert_eq!(gateway.recorded_amounts(), vec![2500, 99]);
    }
}
