// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The request-facing facade: get, retrieve, restock.

use std::sync::Arc;

use tracing::debug;

use shelf_store::{ProductId, StockStore};

use crate::{
    builder::ShelfBuilder,
    cache::StockCache,
    debounce::FlushDebouncer,
    error::{Error, Result},
};

/// Policy applied when a retrieval asks for more stock than is cached.
///
/// Both policies are legitimate; the chosen one applies consistently to every
/// request served by the same [`Shelf`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetrievalPolicy {
    /// Reject retrievals that would drive the quantity negative with
    /// [`Error::InsufficientStock`], leaving the cache unchanged. The check
    /// and the decrement are a single atomic step, so racing retrievals can
    /// never double-spend.
    #[default]
    Strict,
    /// Accept every retrieval unconditionally, allowing the cached quantity
    /// to go negative.
    AllowNegative,
}

/// The in-memory front for a slow stock store.
///
/// A `Shelf` serves reads from a read-through [`StockCache`], commits
/// mutations to the cache synchronously (so any later read on this process
/// observes them), and arms a per-product [`FlushDebouncer`] that pushes the
/// final quantity upstream once the product has been quiet for the configured
/// delay. The store therefore lags the cache by at most the flush delay plus
/// the write itself.
///
/// Clones are cheap and share all state; hand one to each request handler.
///
/// # Examples
///
/// ```
/// use shelf::{ProductId, RetrievalPolicy, Shelf};
/// use shelf_store::testing::MockStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), shelf::Error> {
/// let shelf = Shelf::builder(MockStore::with_data([(ProductId::from(3), 10)]))
///     .retrieval_policy(RetrievalPolicy::Strict)
///     .build();
///
/// shelf.retrieve(ProductId::from(3), 4).await?;
/// assert_eq!(shelf.get_stock(ProductId::from(3)).await?, 6);
///
/// // More than is available: rejected, cache unchanged.
/// assert!(shelf.retrieve(ProductId::from(3), 7).await.is_err());
/// assert_eq!(shelf.get_stock(ProductId::from(3)).await?, 6);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Shelf<S> {
    cache: Arc<StockCache<S>>,
    debouncer: FlushDebouncer,
    policy: RetrievalPolicy,
}

impl<S> Clone for Shelf<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            debouncer: self.debouncer.clone(),
            policy: self.policy,
        }
    }
}

impl<S> Shelf<S> {
    /// Creates a builder for a shelf fronting the given store.
    #[must_use]
    pub fn builder(store: S) -> ShelfBuilder<S> {
        ShelfBuilder::new(store)
    }

    pub(crate) fn new(cache: Arc<StockCache<S>>, debouncer: FlushDebouncer, policy: RetrievalPolicy) -> Self {
        Self {
            cache,
            debouncer,
            policy,
        }
    }

    /// Returns the retrieval policy this shelf applies.
    #[must_use]
    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }

    /// Returns the number of products with a flush currently pending.
    #[must_use]
    pub fn pending_flushes(&self) -> usize {
        self.debouncer.armed_count()
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &StockCache<S> {
        &self.cache
    }
}

impl<S> Shelf<S>
where
    S: StockStore + 'static,
{
    /// Returns the current known quantity for a product.
    ///
    /// Served from the cache; the backing store is consulted only on the
    /// first access to a product.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the product was not cached and the load
    /// from the backing store failed.
    pub async fn get_stock(&self, id: ProductId) -> Result<i64> {
        Ok(self.cache.get_or_load(id).await?)
    }

    /// Removes `amount` units of a product from stock.
    ///
    /// The decrement commits to the cache before this method returns and the
    /// deferred write-back timer is (re)armed. Under
    /// [`RetrievalPolicy::Strict`] a retrieval that would drive the quantity
    /// negative is rejected atomically; under
    /// [`RetrievalPolicy::AllowNegative`] it is accepted and the quantity
    /// goes negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientStock`] on a strict-policy rejection, or
    /// [`Error::Store`] if the initial cache load failed.
    pub async fn retrieve(&self, id: ProductId, amount: u32) -> Result<()> {
        // Ensure the entry is loaded before the atomic decrement.
        self.cache.get_or_load(id).await?;

        let amount = i64::from(amount);
        let quantity = match self.policy {
            RetrievalPolicy::Strict => {
                self.cache
                    .try_apply_delta(id, -amount)
                    .map_err(|available| Error::InsufficientStock {
                        id,
                        requested: amount,
                        available,
                    })?
            }
            RetrievalPolicy::AllowNegative => self.cache.apply_delta(id, -amount),
        };

        debug!(product = %id, amount, quantity, "retrieval committed");
        self.debouncer.arm(id);
        Ok(())
    }

    /// Adds `amount` units of a product to stock.
    ///
    /// The increment commits to the cache before this method returns and the
    /// deferred write-back timer is (re)armed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the initial cache load failed.
    pub async fn restock(&self, id: ProductId, amount: u32) -> Result<()> {
        self.cache.get_or_load(id).await?;

        let quantity = self.cache.apply_delta(id, i64::from(amount));
        debug!(product = %id, amount, quantity, "restock committed");
        self.debouncer.arm(id);
        Ok(())
    }

    /// Immediately pushes every pending quantity to the backing store.
    ///
    /// Intended for orderly shutdown; see [`FlushDebouncer::flush_all`].
    pub async fn flush_all(&self) {
        self.debouncer.flush_all().await;
    }
}
