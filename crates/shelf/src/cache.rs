// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The read-through stock cache with atomic per-product mutations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use shelf_store::{ProductId, StockStore};

/// A concurrent mapping from product id to the current known quantity.
///
/// Entries are populated lazily on first access (read-through) and mutated in
/// place by every retrieve/restock; they live for the process lifetime. All
/// synchronization is internal: callers never take locks.
///
/// The cache talks to the backing store only on a load miss. Propagating
/// mutations back to the store is the flusher's job, not the cache's.
///
/// # Examples
///
/// ```
/// use shelf::{ProductId, StockCache};
/// use shelf_store::testing::MockStore;
/// use std::sync::Arc;
/// # futures::executor::block_on(async {
///
/// let store = Arc::new(MockStore::with_data([(ProductId::from(1), 10)]));
/// let cache = StockCache::new(store);
///
/// // First access loads from the store; later accesses do not.
/// assert_eq!(cache.get_or_load(ProductId::from(1)).await?, 10);
/// assert_eq!(cache.apply_delta(ProductId::from(1), -4), 6);
/// assert_eq!(cache.peek(ProductId::from(1)), Some(6));
/// # Ok::<(), shelf_store::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct StockCache<S> {
    store: Arc<S>,
    entries: DashMap<ProductId, i64>,
    /// Per-product gates that coalesce concurrent load misses: the first
    /// caller loads while the rest wait and re-check the cache.
    loading: DashMap<ProductId, Arc<Mutex<()>>>,
}

impl<S> StockCache<S>
where
    S: StockStore,
{
    /// Creates an empty cache in front of the given store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
            loading: DashMap::new(),
        }
    }

    /// Returns the cached quantity, loading it from the backing store on a
    /// miss.
    ///
    /// Concurrent misses for the same product coalesce to a single store
    /// read: one caller loads while the others wait on a per-product gate
    /// and then observe the freshly cached value.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the load fails. Failed loads are not
    /// cached; the next caller retries.
    pub async fn get_or_load(&self, id: ProductId) -> Result<i64, shelf_store::Error> {
        if let Some(quantity) = self.peek(id) {
            return Ok(quantity);
        }

        let gate = Arc::clone(self.loading.entry(id).or_default().value());
        let _leader = gate.lock().await;

        // A leader that held the gate before us may have populated the entry.
        if let Some(quantity) = self.peek(id) {
            return Ok(quantity);
        }

        debug!(product = %id, "cache miss, loading from backing store");
        let quantity = self.store.get_stock(id).await?;
        self.entries.insert(id, quantity);
        self.loading.remove(&id);
        debug!(product = %id, quantity, "loaded into cache");
        Ok(quantity)
    }

    /// Returns the cached quantity without consulting the backing store.
    #[must_use]
    pub fn peek(&self, id: ProductId) -> Option<i64> {
        self.entries.get(&id).map(|entry| *entry)
    }

    /// Atomically adjusts the cached quantity by `delta` and returns the
    /// post-update quantity.
    ///
    /// This is the only unconditional mutation primitive; it is atomic with
    /// respect to other `apply_delta` / [`try_apply_delta`] calls on the same
    /// product, so get-then-set races cannot lose updates.
    ///
    /// [`try_apply_delta`]: Self::try_apply_delta
    pub fn apply_delta(&self, id: ProductId, delta: i64) -> i64 {
        let mut entry = self.entries.entry(id).or_insert(0);
        *entry += delta;
        *entry
    }

    /// Atomically adjusts the cached quantity by `delta` only if the result
    /// stays non-negative.
    ///
    /// Returns the post-update quantity on success, or `Err` carrying the
    /// unchanged current quantity when the adjustment would go negative. The
    /// check and the update happen under the same per-product lock, so two
    /// racing retrievals can never double-spend stock.
    pub fn try_apply_delta(&self, id: ProductId, delta: i64) -> Result<i64, i64> {
        let mut entry = self.entries.entry(id).or_insert(0);
        let next = *entry + delta;
        if next < 0 {
            return Err(*entry);
        }
        *entry = next;
        Ok(next)
    }

    /// Returns the number of products currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no products are cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the store this cache fronts.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_store::testing::{MockStore, StoreOp};

    fn cache_with(data: impl IntoIterator<Item = (ProductId, i64)>) -> (StockCache<MockStore>, MockStore) {
        let store = MockStore::with_data(data);
        (StockCache::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn load_miss_reads_the_store_once() {
        let (cache, store) = cache_with([(ProductId::from(5), 8)]);

        assert_eq!(cache.get_or_load(ProductId::from(5)).await.unwrap(), 8);
        assert_eq!(cache.get_or_load(ProductId::from(5)).await.unwrap(), 8);
        assert_eq!(cache.get_or_load(ProductId::from(5)).await.unwrap(), 8);

        assert_eq!(store.operations(), vec![StoreOp::Get(ProductId::from(5))]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_coalesce_to_one_load() {
        let store = MockStore::with_data([(ProductId::from(1), 4)]).with_latency(std::time::Duration::from_millis(200));
        let cache = StockCache::new(Arc::new(store.clone()));

        let loads = futures::future::join_all((0..4).map(|_| cache.get_or_load(ProductId::from(1))));
        for result in loads.await {
            assert_eq!(result.unwrap(), 4);
        }

        assert_eq!(store.operations(), vec![StoreOp::Get(ProductId::from(1))]);
    }

    #[tokio::test]
    async fn failed_loads_are_not_cached() {
        let (cache, store) = cache_with([(ProductId::from(2), 6)]);
        store.fail_when(|op| matches!(op, StoreOp::Get(_)));

        assert!(cache.get_or_load(ProductId::from(2)).await.is_err());
        assert_eq!(cache.peek(ProductId::from(2)), None);

        store.clear_failures();
        assert_eq!(cache.get_or_load(ProductId::from(2)).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn apply_delta_is_relative_to_the_loaded_value() {
        let (cache, _store) = cache_with([(ProductId::from(3), 10)]);
        cache.get_or_load(ProductId::from(3)).await.unwrap();

        assert_eq!(cache.apply_delta(ProductId::from(3), 5), 15);
        assert_eq!(cache.apply_delta(ProductId::from(3), -12), 3);
        assert_eq!(cache.peek(ProductId::from(3)), Some(3));
    }

    #[test]
    fn try_apply_delta_rejects_at_zero() {
        let (cache, _store) = cache_with([]);
        cache.apply_delta(ProductId::from(7), 2);

        assert_eq!(cache.try_apply_delta(ProductId::from(7), -2), Ok(0));
        assert_eq!(cache.try_apply_delta(ProductId::from(7), -1), Err(0));
        assert_eq!(cache.peek(ProductId::from(7)), Some(0));
    }

    #[test]
    fn len_tracks_distinct_products() {
        let (cache, _store) = cache_with([]);
        assert!(cache.is_empty());

        cache.apply_delta(ProductId::from(1), 1);
        cache.apply_delta(ProductId::from(2), 1);
        cache.apply_delta(ProductId::from(1), 1);

        assert_eq!(cache.len(), 2);
    }
}
