//! In-memory document store for tests and local development.
//!
//! Every collection is one `RwLock`; a conditional write checks its filter and
//! mutates under the same write guard, which gives the single-document
//! atomicity the ports require.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use craftowl_auth::{Role, User, UserStore};
use craftowl_catalog::{Review, ReviewStore, Tool, ToolQuery, ToolSort, ToolStore};
use craftowl_core::{Email, Entity, InsertionOrder, OrderId, StoreError, StoreResult, ToolId};
use craftowl_orders::{Order, OrderFilter, OrderPatch, OrderStore};

#[derive(Debug)]
struct Slot<T> {
    seq: u64,
    value: T,
}

#[derive(Debug)]
struct Documents<T: Entity> {
    by_id: HashMap<T::Id, Slot<T>>,
    next_seq: u64,
}

/// A keyed collection that remembers insertion order.
#[derive(Debug)]
pub struct InMemoryCollection<T: Entity> {
    inner: RwLock<Documents<T>>,
}

impl<T: Entity> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Documents {
                by_id: HashMap::new(),
                next_seq: 0,
            }),
        }
    }
}

impl<T> InMemoryCollection<T>
where
    T: Entity + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Documents<T>>> {
        self.inner
            .read()
            .map_err(|_| StoreError::unavailable("collection lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Documents<T>>> {
        self.inner
            .write()
            .map_err(|_| StoreError::unavailable("collection lock poisoned"))
    }

    /// Insert or replace by id. A replaced document keeps its position.
    pub fn upsert(&self, value: T) -> StoreResult<T> {
        let mut docs = self.write()?;
        let id = value.id().clone();
        match docs.by_id.get_mut(&id) {
            Some(slot) => slot.value = value.clone(),
            None => {
                let seq = docs.next_seq;
                docs.next_seq += 1;
                docs.by_id.insert(id, Slot { seq, value: value.clone() });
            }
        }
        Ok(value)
    }

    /// Return the document for `id`, creating it with `make` first if absent,
    /// after applying `update` to it.
    pub fn upsert_with(
        &self,
        id: &T::Id,
        make: impl FnOnce() -> T,
        update: impl FnOnce(&mut T),
    ) -> StoreResult<T> {
        let mut docs = self.write()?;
        if !docs.by_id.contains_key(id) {
            let seq = docs.next_seq;
            docs.next_seq += 1;
            docs.by_id.insert(id.clone(), Slot { seq, value: make() });
        }
        let slot = docs
            .by_id
            .get_mut(id)
            .ok_or_else(|| StoreError::corrupt("document vanished under write lock"))?;
        update(&mut slot.value);
        Ok(slot.value.clone())
    }

    pub fn get(&self, id: &T::Id) -> StoreResult<Option<T>> {
        Ok(self.read()?.by_id.get(id).map(|slot| slot.value.clone()))
    }

    /// Apply `update` to `id` only if `condition` holds; returns the new value.
    pub fn update_if(
        &self,
        id: &T::Id,
        condition: impl FnOnce(&T) -> bool,
        update: impl FnOnce(&mut T),
    ) -> StoreResult<Option<T>> {
        let mut docs = self.write()?;
        let Some(slot) = docs.by_id.get_mut(id) else {
            return Ok(None);
        };
        if !condition(&slot.value) {
            return Ok(None);
        }
        update(&mut slot.value);
        Ok(Some(slot.value.clone()))
    }

    /// Remove `id` only if `condition` holds.
    pub fn remove_if(&self, id: &T::Id, condition: impl FnOnce(&T) -> bool) -> StoreResult<bool> {
        let mut docs = self.write()?;
        let matched = docs.by_id.get(id).is_some_and(|slot| condition(&slot.value));
        if matched {
            docs.by_id.remove(id);
        }
        Ok(matched)
    }

    /// All documents accepted by `keep`, in insertion order.
    pub fn scan(&self, order: InsertionOrder, keep: impl Fn(&T) -> bool) -> StoreResult<Vec<T>> {
        let docs = self.read()?;
        let mut slots: Vec<&Slot<T>> = docs.by_id.values().filter(|s| keep(&s.value)).collect();
        match order {
            InsertionOrder::OldestFirst => slots.sort_by_key(|s| s.seq),
            InsertionOrder::NewestFirst => slots.sort_by_key(|s| std::cmp::Reverse(s.seq)),
        }
        Ok(slots.into_iter().map(|s| s.value.clone()).collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.by_id.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// All four resource collections behind one value.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: InMemoryCollection<User>,
    tools: InMemoryCollection<Tool>,
    orders: InMemoryCollection<Order>,
    reviews: InMemoryCollection<Review>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn upsert(&self, email: &Email) -> StoreResult<User> {
        self.users.upsert_with(email, || User::new(email.clone()), |_| {})
    }

    async fn find(&self, email: &Email) -> StoreResult<Option<User>> {
        self.users.get(email)
    }

    async fn merge_profile(&self, email: &Email, profile: Map<String, Value>) -> StoreResult<User> {
        self.users
            .upsert_with(email, || User::new(email.clone()), |user| user.merge_profile(profile))
    }

    async fn set_role(&self, email: &Email, role: Option<Role>) -> StoreResult<Option<User>> {
        self.users.update_if(email, |_| true, |user| user.role = role)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users = self.users.scan(InsertionOrder::OldestFirst, |_| true)?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }
}

#[async_trait]
impl ToolStore for InMemoryStore {
    async fn insert(&self, tool: Tool) -> StoreResult<Tool> {
        self.tools.upsert(tool)
    }

    async fn find(&self, id: ToolId) -> StoreResult<Option<Tool>> {
        self.tools.get(&id)
    }

    async fn delete(&self, id: ToolId) -> StoreResult<bool> {
        self.tools.remove_if(&id, |_| true)
    }

    async fn query(&self, query: ToolQuery) -> StoreResult<Vec<Tool>> {
        let mut tools = match query.sort {
            ToolSort::Newest => self.tools.scan(InsertionOrder::NewestFirst, |_| true)?,
            ToolSort::PriceAscending => {
                let mut tools = self.tools.scan(InsertionOrder::OldestFirst, |_| true)?;
                tools.sort_by_key(|t| t.price);
                tools
            }
        };
        if let Some(limit) = query.limit {
            tools.truncate(limit);
        }
        Ok(tools)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert(&self, order: Order) -> StoreResult<Order> {
        self.orders.upsert(order)
    }

    async fn find(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.orders.get(&id)
    }

    async fn list(&self, filter: &OrderFilter, order: InsertionOrder) -> StoreResult<Vec<Order>> {
        self.orders.scan(order, |o| filter.matches(o))
    }

    async fn update_where(
        &self,
        id: OrderId,
        filter: &OrderFilter,
        patch: &OrderPatch,
    ) -> StoreResult<Option<Order>> {
        self.orders.update_if(&id, |o| filter.matches(o), |o| patch.apply(o))
    }

    async fn delete_where(&self, id: OrderId, filter: &OrderFilter) -> StoreResult<bool> {
        self.orders.remove_if(&id, |o| filter.matches(o))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn upsert(&self, review: Review) -> StoreResult<Review> {
        self.reviews.upsert(review)
    }

    async fn list(&self, order: InsertionOrder) -> StoreResult<Vec<Review>> {
        self.reviews.scan(order, |_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use craftowl_orders::{OrderStatus, PlaceOrder};

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn order_for(who: &str) -> Order {
        PlaceOrder {
            email: email(who),
            tool_id: "T1".into(),
            quantity: 1,
            details: Map::new(),
            occurred_at: Utc::now(),
        }
        .into_order()
        .unwrap()
    }

    #[test]
    fn collection_keeps_position_on_replace() {
        let docs = InMemoryCollection::<Order>::new();
        let first = docs.upsert(order_for("a@x.com")).unwrap();
        let second = docs.upsert(order_for("b@x.com")).unwrap();

        let mut replaced = first.clone();
        replaced.quantity = 9;
        docs.upsert(replaced).unwrap();

        let ids: Vec<_> = docs
            .scan(InsertionOrder::OldestFirst, |_| true)
            .unwrap()
            .into_iter()
            .map(|o| (o.id, o.quantity))
            .collect();
        assert_eq!(ids, vec![(first.id, 9), (second.id, 1)]);
        assert_eq!(docs.len().unwrap(), 2);
    }

    #[test]
    fn conditional_ops_leave_non_matching_documents_alone() {
        let orders = InMemoryCollection::<Order>::new();
        let order = orders.upsert(order_for("a@x.com")).unwrap();

        let pending = OrderFilter::any().in_status(OrderStatus::Pending);
        assert!(!orders.remove_if(&order.id, |o| pending.matches(o)).unwrap());
        assert_eq!(
            orders.update_if(&order.id, |o| pending.matches(o), |o| o.quantity = 5).unwrap(),
            None
        );
        assert_eq!(orders.get(&order.id).unwrap(), Some(order.clone()));

        assert!(orders.remove_if(&order.id, |_| true).unwrap());
        assert!(orders.is_empty().unwrap());
    }

    #[tokio::test]
    async fn user_upsert_keeps_existing_role_and_profile() {
        let store = InMemoryStore::new();
        let users: &dyn UserStore = &store;
        let a = email("a@x.com");

        let mut profile = Map::new();
        profile.insert("name".into(), Value::from("Ann"));
        users.merge_profile(&a, profile).await.unwrap();
        users.set_role(&a, Some(Role::Admin)).await.unwrap();

        let again = users.upsert(&a).await.unwrap();
        assert!(again.is_admin());
        assert_eq!(again.profile.get("name"), Some(&Value::from("Ann")));
    }

    #[tokio::test]
    async fn set_role_on_unknown_user_creates_nothing() {
        let store = InMemoryStore::new();
        let users: &dyn UserStore = &store;

        assert_eq!(users.set_role(&email("ghost@x.com"), Some(Role::Admin)).await.unwrap(), None);
        assert!(users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_conditional_updates_apply_once() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let order = OrderStore::insert(&*store, order_for("a@x.com")).await.unwrap();
        let filter = OrderFilter::any().in_status(OrderStatus::Unpaid);

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            let filter = filter.clone();
            handles.push(tokio::spawn(async move {
                let patch = OrderPatch {
                    status: OrderStatus::Pending,
                    transaction_id: Some(format!("tx_{n}")),
                };
                store.update_where(order.id, &filter, &patch).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
    }
}
