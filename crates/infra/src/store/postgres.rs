//! Postgres-backed document store.
//!
//! Each collection is one table with a `BIGSERIAL seq` column for insertion
//! order and a JSONB column for the free-form fields. Conditional order
//! updates are a single `UPDATE ... WHERE ... RETURNING`, so the filter and
//! the write are atomic at the database level.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Connection, pool, or database error | `Unavailable` |
//! | Column decode failure, bad stored value | `Corrupt` |

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use craftowl_auth::user::sanitize_profile;
use craftowl_auth::{Role, User, UserStore};
use craftowl_catalog::{Review, ReviewStore, Tool, ToolQuery, ToolSort, ToolStore};
use craftowl_core::{Email, InsertionOrder, OrderId, Price, StoreError, StoreResult, ToolId};
use craftowl_orders::{Order, OrderFilter, OrderPatch, OrderStore};

const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str = "email, role, profile";
const TOOL_COLUMNS: &str =
    "id, name, price_minor, description, quantity, image, created_at, extra";
const ORDER_COLUMNS: &str =
    "id, email, tool_id, quantity, status, transaction_id, created_at, details";
const REVIEW_COLUMNS: &str = "email, text, rating, updated_at, extra";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small connection pool against `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Idempotent.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        tracing::info!("database schema ready");
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::corrupt(format!("{operation}: {err}"))
        }
        sqlx::Error::Database(db_err) => {
            StoreError::unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        other => StoreError::unavailable(format!("{operation}: {other}")),
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::corrupt(format!("column {name}: {e}")))
}

fn email_column(row: &PgRow, name: &str) -> StoreResult<Email> {
    let raw: String = column(row, name)?;
    Email::parse(&raw).map_err(|e| StoreError::corrupt(format!("column {name}: {e}")))
}

fn to_i64(value: u64, what: &str) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::corrupt(format!("{what} out of range")))
}

fn from_i64<T: TryFrom<i64>>(value: i64, what: &str) -> StoreResult<T> {
    T::try_from(value).map_err(|_| StoreError::corrupt(format!("stored {what} {value} out of range")))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: Option<String> = column(row, "role")?;
    let role = role
        .map(|r| r.parse::<Role>())
        .transpose()
        .map_err(StoreError::corrupt)?;
    let Json(profile): Json<Map<String, Value>> = column(row, "profile")?;

    Ok(User {
        email: email_column(row, "email")?,
        role,
        profile,
    })
}

fn tool_from_row(row: &PgRow) -> StoreResult<Tool> {
    let id: Uuid = column(row, "id")?;
    let price: i64 = column(row, "price_minor")?;
    let quantity: i64 = column(row, "quantity")?;
    let Json(extra): Json<Map<String, Value>> = column(row, "extra")?;

    Ok(Tool {
        id: ToolId::from_uuid(id),
        name: column(row, "name")?,
        price: Price::from_minor_units(from_i64(price, "price")?),
        description: column(row, "description")?,
        quantity: from_i64(quantity, "quantity")?,
        image: column(row, "image")?,
        created_at: column(row, "created_at")?,
        extra,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let id: Uuid = column(row, "id")?;
    let quantity: i64 = column(row, "quantity")?;
    let status: String = column(row, "status")?;
    let Json(details): Json<Map<String, Value>> = column(row, "details")?;

    Ok(Order {
        id: OrderId::from_uuid(id),
        email: email_column(row, "email")?,
        tool_id: column(row, "tool_id")?,
        quantity: from_i64(quantity, "quantity")?,
        status: status
            .parse()
            .map_err(|e| StoreError::corrupt(format!("column status: {e}")))?,
        transaction_id: column(row, "transaction_id")?,
        created_at: column(row, "created_at")?,
        details,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    let rating: i16 = column(row, "rating")?;
    let Json(extra): Json<Map<String, Value>> = column(row, "extra")?;

    Ok(Review {
        email: email_column(row, "email")?,
        text: column(row, "text")?,
        rating: from_i64(i64::from(rating), "rating")?,
        updated_at: column(row, "updated_at")?,
        extra,
    })
}

fn direction(order: InsertionOrder) -> &'static str {
    match order {
        InsertionOrder::NewestFirst => "DESC",
        InsertionOrder::OldestFirst => "ASC",
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self), fields(email = %email), err)]
    async fn upsert(&self, email: &Email) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (email) VALUES ($1) \
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("upsert_user", e))?;
        user_from_row(&row)
    }

    async fn find(&self, email: &Email) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self, profile), fields(email = %email), err)]
    async fn merge_profile(&self, email: &Email, profile: Map<String, Value>) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (email, profile) VALUES ($1, $2) \
             ON CONFLICT (email) DO UPDATE SET profile = users.profile || EXCLUDED.profile \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(email.as_str())
            .bind(Json(sanitize_profile(profile)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("merge_profile", e))?;
        user_from_row(&row)
    }

    #[instrument(skip(self), fields(email = %email), err)]
    async fn set_role(&self, email: &Email, role: Option<Role>) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET role = $2 WHERE email = $1 RETURNING {USER_COLUMNS}");
        sqlx::query(&sql)
            .bind(email.as_str())
            .bind(role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_role", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?
            .iter()
            .map(user_from_row)
            .collect()
    }
}

#[async_trait]
impl ToolStore for PgStore {
    #[instrument(skip(self, tool), fields(tool_id = %tool.id), err)]
    async fn insert(&self, tool: Tool) -> StoreResult<Tool> {
        sqlx::query(
            "INSERT INTO tools (id, name, price_minor, description, quantity, image, created_at, extra) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(tool.id.as_uuid())
        .bind(&tool.name)
        .bind(to_i64(tool.price.minor_units(), "price")?)
        .bind(&tool.description)
        .bind(i64::from(tool.quantity))
        .bind(&tool.image)
        .bind(tool.created_at)
        .bind(Json(&tool.extra))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_tool", e))?;
        Ok(tool)
    }

    async fn find(&self, id: ToolId) -> StoreResult<Option<Tool>> {
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tool", e))?
            .as_ref()
            .map(tool_from_row)
            .transpose()
    }

    #[instrument(skip(self), fields(tool_id = %id), err)]
    async fn delete(&self, id: ToolId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tool", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, query: ToolQuery) -> StoreResult<Vec<Tool>> {
        let ordering = match query.sort {
            ToolSort::Newest => "seq DESC",
            ToolSort::PriceAscending => "price_minor ASC, seq ASC",
        };
        let limit = query
            .limit
            .map(|n| to_i64(n as u64, "limit"))
            .transpose()?;
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools ORDER BY {ordering} LIMIT $1");
        sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_tools", e))?
            .iter()
            .map(tool_from_row)
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    async fn insert(&self, order: Order) -> StoreResult<Order> {
        sqlx::query(
            "INSERT INTO orders (id, email, tool_id, quantity, status, transaction_id, created_at, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id.as_uuid())
        .bind(order.email.as_str())
        .bind(&order.tool_id)
        .bind(i64::from(order.quantity))
        .bind(order.status.as_str())
        .bind(order.transaction_id.as_deref())
        .bind(order.created_at)
        .bind(Json(&order.details))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(order)
    }

    async fn find(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order", e))?
            .as_ref()
            .map(order_from_row)
            .transpose()
    }

    async fn list(&self, filter: &OrderFilter, order: InsertionOrder) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::text IS NULL OR email = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY seq {}",
            direction(order)
        );
        sqlx::query(&sql)
            .bind(filter.owner.as_ref().map(Email::as_str))
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?
            .iter()
            .map(order_from_row)
            .collect()
    }

    #[instrument(skip(self, filter, patch), fields(order_id = %id, status = %patch.status), err)]
    async fn update_where(
        &self,
        id: OrderId,
        filter: &OrderFilter,
        patch: &OrderPatch,
    ) -> StoreResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET status = $4, transaction_id = COALESCE($5, transaction_id) \
             WHERE id = $1 AND ($2::text IS NULL OR email = $2) AND ($3::text IS NULL OR status = $3) \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(filter.owner.as_ref().map(Email::as_str))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(patch.status.as_str())
            .bind(patch.transaction_id.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_order", e))?
            .as_ref()
            .map(order_from_row)
            .transpose()
    }

    #[instrument(skip(self, filter), fields(order_id = %id), err)]
    async fn delete_where(&self, id: OrderId, filter: &OrderFilter) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM orders \
             WHERE id = $1 AND ($2::text IS NULL OR email = $2) AND ($3::text IS NULL OR status = $3)",
        )
        .bind(id.as_uuid())
        .bind(filter.owner.as_ref().map(Email::as_str))
        .bind(filter.status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    #[instrument(skip(self, review), fields(email = %review.email), err)]
    async fn upsert(&self, review: Review) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (email, text, rating, updated_at, extra) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO UPDATE SET text = EXCLUDED.text, rating = EXCLUDED.rating, \
             updated_at = EXCLUDED.updated_at, extra = EXCLUDED.extra \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(review.email.as_str())
            .bind(&review.text)
            .bind(i16::from(review.rating))
            .bind(review.updated_at)
            .bind(Json(&review.extra))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("upsert_review", e))?;
        review_from_row(&row)
    }

    async fn list(&self, order: InsertionOrder) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY seq {}",
            direction(order)
        );
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_reviews", e))?
            .iter()
            .map(review_from_row)
            .collect()
    }
}
