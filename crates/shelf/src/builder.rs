// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for constructing a [`Shelf`] with configurable flush delay and
//! retrieval policy.

use std::{sync::Arc, time::Duration};

use futures::FutureExt;

use shelf_store::StockStore;

use crate::{
    cache::StockCache,
    debounce::{FlushDebouncer, FlushFn},
    front::{RetrievalPolicy, Shelf},
};

/// The default quiet period before a mutated product is flushed upstream.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(500);

/// Builder for a [`Shelf`].
///
/// Created by [`Shelf::builder`].
///
/// # Examples
///
/// ```
/// use shelf::{RetrievalPolicy, Shelf};
/// use shelf_store::testing::MockStore;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let shelf = Shelf::builder(MockStore::new())
///     .flush_delay(Duration::from_millis(250))
///     .retrieval_policy(RetrievalPolicy::AllowNegative)
///     .build();
///
/// assert_eq!(shelf.policy(), RetrievalPolicy::AllowNegative);
/// # }
/// ```
#[derive(Debug)]
pub struct ShelfBuilder<S> {
    store: S,
    flush_delay: Duration,
    policy: RetrievalPolicy,
}

impl<S> ShelfBuilder<S> {
    pub(crate) fn new(store: S) -> Self {
        Self {
            store,
            flush_delay: DEFAULT_FLUSH_DELAY,
            policy: RetrievalPolicy::default(),
        }
    }

    /// Sets the quiet period that must elapse after the last mutation of a
    /// product before its quantity is flushed to the backing store.
    ///
    /// This bounds both the per-product upstream write rate and the staleness
    /// of the backing store. Defaults to [`DEFAULT_FLUSH_DELAY`].
    #[must_use]
    pub fn flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    /// Sets the policy applied when a retrieval exceeds the cached quantity.
    ///
    /// Defaults to [`RetrievalPolicy::Strict`].
    #[must_use]
    pub fn retrieval_policy(mut self, policy: RetrievalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the shelf, wiring the debouncer's flush callback to read the
    /// cache's quantity at fire time and push it to the store.
    #[must_use]
    pub fn build(self) -> Shelf<S>
    where
        S: StockStore + 'static,
    {
        let store = Arc::new(self.store);
        let cache = Arc::new(StockCache::new(Arc::clone(&store)));

        let flush: FlushFn = {
            let cache = Arc::clone(&cache);
            Arc::new(move |id| {
                let cache = Arc::clone(&cache);
                let store = Arc::clone(&store);
                async move {
                    // Read at fire time, not arm time: the flush carries
                    // whatever the burst settled on.
                    let Some(quantity) = cache.peek(id) else {
                        return Ok(());
                    };
                    store.set_stock(id, quantity).await
                }
                .boxed()
            })
        };

        let debouncer = FlushDebouncer::new(self.flush_delay, flush);
        Shelf::new(cache, debouncer, self.policy)
    }
}
