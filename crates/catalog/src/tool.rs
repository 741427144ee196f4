use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use craftowl_core::{DomainError, DomainResult, Entity, Price, StoreResult, ToolId};

/// Size of the storefront's "top tools" view.
pub const TOP_TOOLS_LIMIT: usize = 6;

/// A tool listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub price: Price,
    pub description: String,
    /// Units in stock.
    pub quantity: u32,
    /// Image URL.
    pub image: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Tool {
    type Id = ToolId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateTool (admin).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTool {
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreateTool {
    pub fn into_tool(self, now: DateTime<Utc>) -> DomainResult<Tool> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("tool name must not be empty"));
        }
        if self.price.is_zero() {
            return Err(DomainError::validation("tool price must be positive"));
        }

        let mut extra = self.extra;
        for key in ["id", "createdAt"] {
            extra.remove(key);
        }

        Ok(Tool {
            id: ToolId::new(),
            name,
            price: self.price,
            description: self.description,
            quantity: self.quantity,
            image: self.image,
            created_at: now,
            extra,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ToolSort {
    /// Most recently inserted first.
    Newest,
    /// Cheapest first; equal prices keep insertion order.
    PriceAscending,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ToolQuery {
    pub sort: ToolSort,
    pub limit: Option<usize>,
}

impl ToolQuery {
    /// Full catalog, newest first.
    pub fn all() -> Self {
        Self {
            sort: ToolSort::Newest,
            limit: None,
        }
    }

    /// Newest `limit` tools.
    pub fn top(limit: usize) -> Self {
        Self {
            sort: ToolSort::Newest,
            limit: Some(limit),
        }
    }

    /// The single lowest-priced tool.
    pub fn cheapest() -> Self {
        Self {
            sort: ToolSort::PriceAscending,
            limit: Some(1),
        }
    }
}

/// Persistence port for tools.
#[async_trait]
pub trait ToolStore: Send + Sync {
    async fn insert(&self, tool: Tool) -> StoreResult<Tool>;

    async fn find(&self, id: ToolId) -> StoreResult<Option<Tool>>;

    /// Returns whether a tool was removed.
    async fn delete(&self, id: ToolId) -> StoreResult<bool>;

    async fn query(&self, query: ToolQuery) -> StoreResult<Vec<Tool>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_tool_parses_decimal_price_and_keeps_extra_fields() {
        let cmd: CreateTool = serde_json::from_value(json!({
            "name": " Hammer ",
            "price": 25.0,
            "quantity": 40,
            "minOrder": 5,
            "id": "ignored"
        }))
        .unwrap();

        let tool = cmd.into_tool(Utc::now()).unwrap();
        assert_eq!(tool.name, "Hammer");
        assert_eq!(tool.price.minor_units(), 2500);
        assert_eq!(tool.extra.get("minOrder"), Some(&json!(5)));
        assert!(!tool.extra.contains_key("id"));
    }

    #[test]
    fn create_tool_rejects_blank_name_and_free_price() {
        let blank: CreateTool = serde_json::from_value(json!({ "name": "", "price": 1.0 })).unwrap();
        assert!(blank.into_tool(Utc::now()).is_err());

        let free: CreateTool = serde_json::from_value(json!({ "name": "Saw", "price": 0 })).unwrap();
        assert!(free.into_tool(Utc::now()).is_err());
    }

    #[test]
    fn named_queries() {
        assert_eq!(ToolQuery::top(TOP_TOOLS_LIMIT).limit, Some(6));
        assert_eq!(ToolQuery::cheapest().sort, ToolSort::PriceAscending);
        assert_eq!(ToolQuery::all().limit, None);
    }
}
