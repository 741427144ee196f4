//! Payment-processor adapters.

pub mod in_memory;
pub mod stripe;

pub use in_memory::InMemoryPaymentGateway;
pub use stripe::{StripeConfig, StripeGateway};
