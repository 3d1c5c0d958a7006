//! Test repositories: in-memory `OrderRepository` implementations for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use orderflow_core::error::StorageError;
use orderflow_core::model::Order;
use orderflow_core::repository::OrderRepository;

#[derive(Debug, Default)]
struct Inner {
    orders: HashMap<String, Order>,
    commit_order: Vec<String>,
    persist_calls: usize,
}

/// An order repository backed by a `HashMap`, with the same duplicate and
/// not-found semantics as the `PostgreSQL` repository. Loads of selected
/// identifiers and all persists can be made to fail.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: Mutex<Inner>,
    failing_loads: Mutex<HashSet<String>>,
    fail_persist: Mutex<bool>,
    reject_persist: Mutex<bool>,
}

impl InMemoryOrderRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository that already holds `orders`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let repo = Self::new();
        {
            let mut inner = repo.inner.lock().unwrap();
            for order in orders {
                inner.commit_order.push(order.order_uid.clone());
                inner.orders.insert(order.order_uid.clone(), order);
            }
        }
        repo
    }

    /// Makes `load_by_identifier(order_uid)` fail with `StorageError::Unavailable`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_loads_of(&self, order_uid: &str) {
        self.failing_loads.lock().unwrap().insert(order_uid.to_owned());
    }

    /// Makes every subsequent `persist` fail with `StorageError::Unavailable`
    /// (`true`) or behave normally again (`false`).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_fail_persist(&self, fail: bool) {
        *self.fail_persist.lock().unwrap() = fail;
    }

    /// Makes every subsequent `persist` fail with `StorageError::Rejected`,
    /// as a database refusing the values would.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_reject_persist(&self, reject: bool) {
        *self.reject_persist.lock().unwrap() = reject;
    }

    /// Number of committed orders.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored_count(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    /// Number of `persist` calls, successful or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn persist_calls(&self) -> usize {
        self.inner.lock().unwrap().persist_calls
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn persist(&self, order: &Order) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner.persist_calls += 1;
        if *self.fail_persist.lock().unwrap() {
            return Err(StorageError::Unavailable("connection refused".into()));
        }
        if *self.reject_persist.lock().unwrap() {
            return Err(StorageError::Rejected("value too long for column".into()));
        }
        if inner.orders.contains_key(&order.order_uid) {
            return Err(StorageError::DuplicateOrder(order.order_uid.clone()));
        }
        inner.commit_order.push(order.order_uid.clone());
        inner.orders.insert(order.order_uid.clone(), order.clone());
        Ok(())
    }

    async fn list_identifiers(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.inner.lock().unwrap().commit_order.clone())
    }

    async fn load_by_identifier(&self, order_uid: &str) -> Result<Order, StorageError> {
        if self.failing_loads.lock().unwrap().contains(order_uid) {
            return Err(StorageError::Unavailable("connection reset".into()));
        }
        self.inner
            .lock()
            .unwrap()
            .orders
            .get(order_uid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(order_uid.to_owned()))
    }
}

/// An order repository that always returns `StorageError::Unavailable`.
/// Useful for testing error-handling paths.
#[derive(Debug)]
pub struct FailingOrderRepository;

#[async_trait]
impl OrderRepository for FailingOrderRepository {
    async fn persist(&self, _order: &Order) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }

    async fn list_identifiers(&self) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }

    async fn load_by_identifier(&self, _order_uid: &str) -> Result<Order, StorageError> {
        Err(StorageError::Unavailable("connection refused".into()))
    }
}
