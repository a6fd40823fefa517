// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock stock store for testing.
//!
//! This module provides [`MockStore`], a configurable in-memory store that
//! records all operations, supports failure injection for testing error
//! paths, and can simulate the latency of the real upstream system.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{Error, ProductId, StockStore};

/// Recorded store operation with full context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// A stock read was performed for the given product.
    Get(ProductId),
    /// A stock write was performed.
    Set {
        /// The product that was written.
        id: ProductId,
        /// The quantity that was written.
        quantity: i64,
    },
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A configurable mock stock store for testing.
///
/// The store keeps quantities in memory and can be configured to fail
/// operations on demand, making it useful for testing error handling paths.
/// All operations are recorded for later verification. An optional per-call
/// latency simulates the slow upstream system; it cooperates with tokio's
/// paused test clock.
///
/// Clones share the same underlying state, so a test can hand one clone to
/// the system under test and keep another for assertions.
///
/// # Examples
///
/// ```
/// use shelf_store::{ProductId, StockStore};
/// use shelf_store::testing::{MockStore, StoreOp};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MockStore::with_data([(ProductId::from(3), 10)]);
///
/// assert_eq!(store.get_stock(ProductId::from(3)).await.unwrap(), 10);
/// store.set_stock(ProductId::from(3), 15).await.unwrap();
///
/// assert_eq!(
///     store.operations(),
///     vec![
///         StoreOp::Get(ProductId::from(3)),
///         StoreOp::Set { id: ProductId::from(3), quantity: 15 },
///     ],
/// );
/// # }
/// ```
///
/// # Failure Injection
///
/// ```
/// use shelf_store::{ProductId, StockStore};
/// use shelf_store::testing::{MockStore, StoreOp};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MockStore::new();
///
/// // Fail all writes while leaving reads untouched.
/// store.fail_when(|op| matches!(op, StoreOp::Set { .. }));
/// assert!(store.set_stock(ProductId::from(1), 5).await.is_err());
/// assert!(store.get_stock(ProductId::from(1)).await.is_ok());
/// # }
/// ```
pub struct MockStore {
    data: Arc<Mutex<HashMap<ProductId, i64>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    latency: Duration,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("latency", &self.latency)
            .finish()
    }
}

impl Clone for MockStore {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            latency: self.latency,
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates a new empty mock store with no latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            latency: Duration::ZERO,
        }
    }

    /// Creates a mock store seeded with initial quantities.
    #[must_use]
    pub fn with_data(data: impl IntoIterator<Item = (ProductId, i64)>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data.into_iter().collect())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            latency: Duration::ZERO,
        }
    }

    /// Sets the simulated per-call latency of the store.
    ///
    /// The latency is applied before each operation via an async sleep, so
    /// under `tokio::time::pause` the test clock advances instead of wall
    /// time passing.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the quantity currently held by the store for a product,
    /// without recording an operation.
    #[must_use]
    pub fn stock_of(&self, id: ProductId) -> Option<i64> {
        self.data.lock().get(&id).copied()
    }

    /// Returns the number of products the store holds.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should
    /// fail. Failed operations are still recorded.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &StoreOp) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl StockStore for MockStore {
    async fn get_stock(&self, id: ProductId) -> Result<i64, Error> {
        self.simulate_latency().await;
        let op = StoreOp::Get(id);
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::from_message("mock: get_stock failed"));
        }
        self.record(op);
        Ok(self.data.lock().get(&id).copied().unwrap_or(0))
    }

    async fn set_stock(&self, id: ProductId, quantity: i64) -> Result<(), Error> {
        self.simulate_latency().await;
        let op = StoreOp::Set { id, quantity };
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::from_message("mock: set_stock failed"));
        }
        self.record(op);
        self.data.lock().insert(id, quantity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_products_report_zero() {
        let store = MockStore::new();
        assert_eq!(store.get_stock(ProductId::from(99)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MockStore::new();
        store.set_stock(ProductId::from(1), 12).await.unwrap();
        assert_eq!(store.get_stock(ProductId::from(1)).await.unwrap(), 12);
        assert_eq!(store.stock_of(ProductId::from(1)), Some(12));
    }

    #[tokio::test]
    async fn records_operations_in_order() {
        let store = MockStore::with_data([(ProductId::from(2), 5)]);
        let _ = store.get_stock(ProductId::from(2)).await;
        store.set_stock(ProductId::from(2), 7).await.unwrap();

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Get(ProductId::from(2)),
                StoreOp::Set {
                    id: ProductId::from(2),
                    quantity: 7
                },
            ],
        );
    }

    #[tokio::test]
    async fn failure_predicate_targets_specific_operations() {
        let store = MockStore::new();
        store.fail_when(|op| matches!(op, StoreOp::Get(id) if *id == ProductId::from(13)));

        assert!(store.get_stock(ProductId::from(13)).await.is_err());
        assert!(store.get_stock(ProductId::from(14)).await.is_ok());

        store.clear_failures();
        assert!(store.get_stock(ProductId::from(13)).await.is_ok());
    }

    #[tokio::test]
    async fn failed_operations_are_still_recorded() {
        let store = MockStore::new();
        store.fail_when(|_| true);
        let _ = store.set_stock(ProductId::from(4), 9).await;

        assert_eq!(
            store.operations(),
            vec![StoreOp::Set {
                id: ProductId::from(4),
                quantity: 9
            }],
        );
        // The write must not have been applied.
        assert_eq!(store.stock_of(ProductId::from(4)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_driven_by_the_test_clock() {
        let store = MockStore::with_data([(ProductId::from(1), 3)]).with_latency(Duration::from_millis(2500));
        let started = tokio::time::Instant::now();
        let quantity = store.get_stock(ProductId::from(1)).await.unwrap();
        assert_eq!(quantity, 3);
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MockStore::new();
        let observer = store.clone();
        store.set_stock(ProductId::from(8), 1).await.unwrap();

        assert_eq!(observer.stock_of(ProductId::from(8)), Some(1));
        assert_eq!(observer.operations().len(), 1);
        observer.clear_operations();
        assert!(store.operations().is_empty());
    }
}
