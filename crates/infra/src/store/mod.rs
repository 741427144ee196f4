//! Document-store adapters for users, tools, orders and reviews.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryCollection, InMemoryStore};
pub use postgres::PgStore;
