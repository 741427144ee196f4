//! Persistence port for orders.
//!
//! State changes are expressed as conditional single-document operations:
//! the adapter applies the write only if the stored order still matches the
//! filter, atomically. Callers never read-decide-write.

use async_trait::async_trait;

use craftowl_core::{Email, InsertionOrder, OrderId, StoreResult};

use crate::order::{Order, OrderStatus};

/// Condition an order must satisfy for a read or conditional write to match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub owner: Option<Email>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn owned_by(email: &Email) -> Self {
        Self {
            owner: Some(email.clone()),
            status: None,
        }
    }

    pub fn in_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.owner.as_ref().is_none_or(|owner| &order.email == owner)
            && self.status.is_none_or(|status| order.status == status)
    }
}

/// Fields a conditional update sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: OrderStatus,
    /// Set when `Some`; left untouched when `None`.
    pub transaction_id: Option<String>,
}

impl OrderPatch {
    pub fn apply(&self, order: &mut Order) {
        order.status = self.status;
        if let Some(tx) = &self.transaction_id {
            order.transaction_id = Some(tx.clone());
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> StoreResult<Order>;

    async fn find(&self, id: OrderId) -> StoreResult<Option<Order>>;

    async fn list(&self, filter: &OrderFilter, order: InsertionOrder) -> StoreResult<Vec<Order>>;

    /// Atomically apply `patch` to order `id` if it matches `filter`.
    ///
    /// Returns the updated order, or `None` if nothing matched.
    async fn update_where(
        &self,
        id: OrderId,
        filter: &OrderFilter,
        patch: &OrderPatch,
    ) -> StoreResult<Option<Order>>;

    /// Atomically delete order `id` if it matches `filter`. Returns whether a
    /// document was removed.
    async fn delete_where(&self, id: OrderId, filter: &OrderFilter) -> StoreResult<bool>;
}
