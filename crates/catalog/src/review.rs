use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use craftowl_core::{DomainError, DomainResult, Email, Entity, InsertionOrder, StoreResult};

/// A customer's review of the marketplace. One per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub email: Email,
    pub text: String,
    /// 1 to 5 stars.
    pub rating: u8,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Review {
    type Id = Email;

    fn id(&self) -> &Self::Id {
        &self.email
    }
}

/// Command: SubmitReview (create or replace the caller's review).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitReview {
    pub text: String,
    pub rating: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubmitReview {
    pub fn into_review(self, author: Email, now: DateTime<Utc>) -> DomainResult<Review> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::validation("review text must not be empty"));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(DomainError::validation("rating must be between 1 and 5"));
        }

        let mut extra = self.extra;
        for key in ["email", "updatedAt"] {
            extra.remove(key);
        }

        Ok(Review {
            email: author,
            text,
            rating: self.rating,
            updated_at: now,
            extra,
        })
    }
}

/// Persistence port for reviews, keyed by author email.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert or replace the author's review. A replaced review keeps its
    /// original position in insertion order.
    async fn upsert(&self, review: Review) -> StoreResult<Review>;

    async fn list(&self, order: InsertionOrder) -> StoreResult<Vec<Review>>;
}
