//! Service wiring: stores, payment gateway, token codec and lifecycle manager,
//! built once at startup and shared with every handler.

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use craftowl_auth::{Access, GuardChain, TokenCodec, UserStore};
use craftowl_catalog::{ReviewStore, ToolStore};
use craftowl_infra::{InMemoryPaymentGateway, InMemoryStore, PgStore, StripeGateway};
use craftowl_orders::{OrderLifecycle, OrderStore, PaymentGateway};

use crate::config::ApiConfig;

pub struct AppServices {
    pub codec: Arc<TokenCodec>,
    pub users: Arc<dyn UserStore>,
    pub tools: Arc<dyn ToolStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub orders: OrderLifecycle,
}

impl AppServices {
    pub fn new<S>(codec: TokenCodec, store: Arc<S>, payments: Arc<dyn PaymentGateway>) -> Self
    where
        S: UserStore + ToolStore + ReviewStore + OrderStore + 'static,
    {
        Self {
            codec: Arc::new(codec),
            users: store.clone(),
            tools: store.clone(),
            reviews: store.clone(),
            orders: OrderLifecycle::new(store, payments),
        }
    }

    /// Everything in process; used by tests and when no database is configured.
    pub fn in_memory(codec: TokenCodec, payments: Arc<dyn PaymentGateway>) -> Self {
        Self::new(codec, Arc::new(InMemoryStore::new()), payments)
    }

    /// Pick adapters from configuration.
    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let codec = TokenCodec::new(&config.token_secret, config.token_ttls);

        let payments: Arc<dyn PaymentGateway> = match &config.stripe {
            Some(stripe) => Arc::new(
                StripeGateway::new(stripe.clone()).context("failed to build Stripe client")?,
            ),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY not set; using in-memory payment gateway");
                Arc::new(InMemoryPaymentGateway::with_currency(config.payment_currency.clone()))
            }
        };

        match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url.expose_secret())
                    .await
                    .context("failed to connect to Postgres")?;
                store.ensure_schema().await.context("failed to prepare schema")?;
                tracing::info!("using PostgreSQL document store");
                Ok(Self::new(codec, Arc::new(store), payments))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory document store");
                Ok(Self::in_memory(codec, payments))
            }
        }
    }

    /// Guard chain for a route's declared access level.
    pub fn guards(&self, access: Access) -> GuardChain {
        GuardChain::for_access(access, self.codec.clone(), self.users.clone())
    }
}
