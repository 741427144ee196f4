//! Infrastructure layer: persistence and payment-processor adapters.
//!
//! Each adapter implements a port declared by a domain crate; the API wires
//! whichever set the configuration selects.

pub mod payment;
pub mod store;


pub use payment::{InMemoryPaymentGateway, StripeConfig, StripeGateway};
pub use store::{InMemoryCollection, InMemoryStore, PgStore};
