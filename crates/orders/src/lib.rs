//! Order domain module.
//!
//! Business rules for orders: the `unpaid → pending → shipped` state machine,
//! the conditional-update port it runs against, and the payment-processor port
//! used to mint payment client secrets. No HTTP, no concrete storage.

pub mod lifecycle;
pub mod order;
pub mod payment;
pub mod store;

pub use lifecycle::{OrderError, OrderLifecycle};
pub use order::{Order, OrderStatus, PlaceOrder};
pub use payment::{PaymentError, PaymentGateway, PaymentIntent};
pub use store::{OrderFilter, OrderPatch, OrderStore};
