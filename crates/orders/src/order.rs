use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use craftowl_core::{DomainError, DomainResult, Email, Entity, OrderId};

/// Order status lifecycle.
///
/// `unpaid → pending → shipped`; `shipped` is terminal and no transition
/// moves an order backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Unpaid,
    Pending,
    Shipped,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "unpaid",
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
        }
    }

    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Unpaid, OrderStatus::Pending) | (OrderStatus::Pending, OrderStatus::Shipped)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(OrderStatus::Unpaid),
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Keys owned by the order itself; never accepted as free-form details.
const RESERVED_DETAIL_KEYS: [&str; 7] = [
    "id",
    "email",
    "toolId",
    "quantity",
    "status",
    "transactionId",
    "createdAt",
];

/// An order placed by one user for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub email: Email,
    /// Catalog reference as given by the client.
    pub tool_id: String,
    pub quantity: u32,
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Free-form fields the storefront sends along (shipping address, phone, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Order {
    pub fn is_owned_by(&self, email: &Email) -> bool {
        &self.email == email
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub email: Email,
    pub tool_id: String,
    pub quantity: u32,
    pub details: Map<String, Value>,
    pub occurred_at: DateTime<Utc>,
}

impl PlaceOrder {
    /// Validate the command and build the new order.
    ///
    /// Orders are always born `unpaid` with no transaction reference.
    pub fn into_order(self) -> DomainResult<Order> {
        let tool_id = self.tool_id.trim().to_string();
        if tool_id.is_empty() {
            return Err(DomainError::validation("toolId must not be empty"));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let mut details = self.details;
        for key in RESERVED_DETAIL_KEYS {
            details.remove(key);
        }

        Ok(Order {
            id: OrderId::new(),
            email: self.email,
            tool_id,
            quantity: self.quantity,
            status: OrderStatus::Unpaid,
            transaction_id: None,
            created_at: self.occurred_at,
            details,
        })
    }
}
