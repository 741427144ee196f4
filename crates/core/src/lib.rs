//! `craftowl-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, value objects, and the error types every other crate speaks.

pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod store;
pub mod value_object;

pub use email::Email;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ToolId};
pub use money::Price;
pub use store::{InsertionOrder, StoreError, StoreResult};
pub use value_object::ValueObject;
