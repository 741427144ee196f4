//! Order lifecycle manager.
//!
//! Every state change is one conditional operation on the `OrderStore`; the
//! condition is repeated in the write itself, so concurrent requests (an admin
//! shipping while the owner cancels) race safely inside the store. A read
//! after a write that matched nothing only decides which error to report.

use std::sync::Arc;

use thiserror::Error;

use craftowl_core::{DomainError, Email, InsertionOrder, OrderId, Price, StoreError};

use crate::order::{Order, OrderStatus, PlaceOrder};
use crate::payment::{PaymentError, PaymentGateway, PaymentIntent};
use crate::store::{OrderFilter, OrderPatch, OrderStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order store failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

pub struct OrderLifecycle {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentGateway>,
}

impl OrderLifecycle {
    pub fn new(orders: Arc<dyn OrderStore>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { orders, payments }
    }

    pub async fn place(&self, cmd: PlaceOrder) -> Result<Order, OrderError> {
        let order = cmd.into_order()?;
        let order = self.orders.insert(order).await?;
        tracing::info!(order_id = %order.id, owner = %order.email, "order placed");
        Ok(order)
    }

    pub async fn order_for_owner(&self, id: OrderId, owner: &Email) -> Result<Order, OrderError> {
        match self.orders.find(id).await? {
            Some(order) if order.is_owned_by(owner) => Ok(order),
            Some(_) => Err(DomainError::forbidden(format!("order {id} belongs to another user")).into()),
            None => Err(DomainError::not_found(format!("order {id}")).into()),
        }
    }

    pub async fn orders_for_owner(&self, owner: &Email) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .list(&OrderFilter::owned_by(owner), InsertionOrder::OldestFirst)
            .await?)
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .list(&OrderFilter::any(), InsertionOrder::OldestFirst)
            .await?)
    }

    /// Ask the processor for a payment intent covering `price`.
    pub async fn start_payment(&self, price: Price) -> Result<PaymentIntent, OrderError> {
        if price.is_zero() {
            return Err(DomainError::validation("price must be positive").into());
        }
        let intent = self.payments.create_intent(price).await?;
        tracing::info!(amount = intent.amount, currency = %intent.currency, "payment intent created");
        Ok(intent)
    }

    /// `unpaid → pending`, recording the processor's transaction reference.
    ///
    /// Replaying the same reference is a no-op success; a different reference
    /// on an already paid order is a conflict.
    pub async fn confirm_payment(
        &self,
        id: OrderId,
        owner: &Email,
        transaction_id: &str,
    ) -> Result<Order, OrderError> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(DomainError::validation("transactionId must not be empty").into());
        }

        let filter = OrderFilter::owned_by(owner).in_status(OrderStatus::Unpaid);
        let patch = OrderPatch {
            status: OrderStatus::Pending,
            transaction_id: Some(transaction_id.to_string()),
        };

        if let Some(order) = self.orders.update_where(id, &filter, &patch).await? {
            tracing::info!(order_id = %id, "payment confirmed; order pending");
            return Ok(order);
        }

        match self.orders.find(id).await? {
            Some(order)
                if order.is_owned_by(owner)
                    && order.transaction_id.as_deref() == Some(transaction_id) =>
            {
                tracing::debug!(order_id = %id, "payment confirmation replayed");
                Ok(order)
            }
            other => Err(miss(id, other, Some(owner), "confirm payment for", Some(OrderStatus::Pending))),
        }
    }

    /// `pending → shipped` (admin).
    pub async fn ship(&self, id: OrderId) -> Result<Order, OrderError> {
        let filter = OrderFilter::any().in_status(OrderStatus::Pending);
        let patch = OrderPatch {
            status: OrderStatus::Shipped,
            transaction_id: None,
        };

        match self.orders.update_where(id, &filter, &patch).await? {
            Some(order) => {
                tracing::info!(order_id = %id, "order shipped");
                Ok(order)
            }
            None => Err(miss(
                id,
                self.orders.find(id).await?,
                None,
                "ship",
                Some(OrderStatus::Shipped),
            )),
        }
    }

    /// Delete an order that was never paid (admin).
    pub async fn purge_unpaid(&self, id: OrderId) -> Result<(), OrderError> {
        let filter = OrderFilter::any().in_status(OrderStatus::Unpaid);
        if self.orders.delete_where(id, &filter).await? {
            tracing::info!(order_id = %id, "unpaid order deleted by admin");
            return Ok(());
        }
        Err(miss(id, self.orders.find(id).await?, None, "delete", None))
    }

    /// Owner cancels their own order; only possible before payment. Another
    /// user's order is reported as missing.
    pub async fn cancel_own(&self, id: OrderId, owner: &Email) -> Result<(), OrderError> {
        let filter = OrderFilter::owned_by(owner).in_status(OrderStatus::Unpaid);
        if self.orders.delete_where(id, &filter).await? {
            tracing::info!(order_id = %id, owner = %owner, "order cancelled by owner");
            return Ok(());
        }
        let current = self.orders.find(id).await?.filter(|o| o.is_owned_by(owner));
        Err(miss(id, current, None, "cancel", None))
    }
}

/// Explain why a conditional write on `id` matched nothing. `target` is the
/// status the write would have moved the order to, if any.
fn miss(
    id: OrderId,
    current: Option<Order>,
    owner: Option<&Email>,
    action: &str,
    target: Option<OrderStatus>,
) -> OrderError {
    let err = match current {
        None => DomainError::not_found(format!("order {id}")),
        Some(order) if owner.is_some_and(|o| !order.is_owned_by(o)) => {
            DomainError::forbidden(format!("order {id} belongs to another user"))
        }
        Some(order) if order.status.is_terminal() => DomainError::conflict(format!(
            "cannot {action} order {id}: it is already {}",
            order.status
        )),
        Some(order) => match target {
            Some(next) if order.status == next => DomainError::conflict(format!(
                "cannot {action} order {id}: it is already {next}"
            )),
            Some(next) if !order.status.can_advance_to(next) => DomainError::conflict(format!(
                "order {id} cannot move from {} to {next}",
                order.status
            )),
            _ => DomainError::conflict(format!(
                "cannot {action} order {id} while it is {}",
                order.status
            )),
        },
    };
    err.into()
}
