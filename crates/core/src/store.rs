//! Persistence-port vocabulary shared by every resource store.
//!
//! The document store is an external collaborator; domain crates describe the
//! operations they need as traits and adapters live in `craftowl-infra`.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a persistence adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be mapped back into a domain value.
    #[error("stored document is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Ordering by insertion sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum InsertionOrder {
    /// Most recently inserted first.
    #[default]
    NewestFirst,
    OldestFirst,
}
