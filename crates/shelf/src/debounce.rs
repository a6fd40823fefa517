// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-product debounced write-back scheduling.
//!
//! Every mutation arms (or re-arms) a logical timer for its product. The
//! timer fires only after a quiet period of the configured delay has elapsed
//! with no further arming — classic debounce, not throttle — and the flush
//! reads the quantity current at fire time, so a burst of mutations produces
//! exactly one upstream write carrying the final value.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, warn};

use shelf_store::ProductId;

/// The write-back action invoked when a product's timer fires.
///
/// The callback must read the *current* cached quantity for the product and
/// push it to the backing store; it is constructed once and shared by every
/// timer worker.
pub type FlushFn = Arc<dyn Fn(ProductId) -> BoxFuture<'static, Result<(), shelf_store::Error>> + Send + Sync>;

/// Timer state for one armed product.
#[derive(Debug, Clone, Copy)]
struct Timer {
    /// When the pending flush fires; pushed out on every re-arm.
    deadline: Instant,
    /// Ties the entry to the worker task that owns it, so a worker that lost
    /// its entry never acts on a successor's.
    epoch: u64,
    /// Set while the owning worker is mid-flush; [`FlushDebouncer::flush_all`]
    /// skips such entries to keep flushes single-flight per product.
    flushing: bool,
}

struct Inner {
    delay: Duration,
    timers: DashMap<ProductId, Timer>,
    epochs: AtomicU64,
    flush: FlushFn,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("delay", &self.delay)
            .field("armed", &self.timers.len())
            .finish_non_exhaustive()
    }
}

/// Coalesces bursts of mutations on the same product into one deferred flush.
///
/// One logical timer exists per product id. [`arm`](Self::arm) creates the
/// timer or resets its countdown; on expiry the flush callback runs exactly
/// once per quiescent period. For a given product no two flushes are ever in
/// flight simultaneously; if a re-arm lands while a flush is running, the
/// next cycle starts only after the current flush completes. Distinct
/// products never coalesce and never block each other's timers.
///
/// A failed flush is logged and dropped: the cache remains the authoritative
/// in-memory value and the next armed cycle retries with the (by then further
/// advanced) current quantity.
///
/// Cloning is cheap and clones share the same timer table.
#[derive(Debug, Clone)]
pub struct FlushDebouncer {
    inner: Arc<Inner>,
}

impl FlushDebouncer {
    /// Creates a debouncer that fires `flush` after `delay` of quiet time
    /// per product.
    #[must_use]
    pub fn new(delay: Duration, flush: FlushFn) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                timers: DashMap::new(),
                epochs: AtomicU64::new(0),
                flush,
            }),
        }
    }

    /// Arms (or re-arms) the timer for a product.
    ///
    /// If no timer exists, one is created that fires after the configured
    /// delay. If one exists and has not fired, its countdown resets: the
    /// flush happens only once the delay elapses with no further `arm` calls.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, id: ProductId) {
        let deadline = Instant::now() + self.inner.delay;
        match self.inner.timers.entry(id) {
            Entry::Occupied(mut armed) => {
                armed.get_mut().deadline = deadline;
            }
            Entry::Vacant(slot) => {
                let epoch = self.inner.epochs.fetch_add(1, Ordering::Relaxed);
                slot.insert(Timer {
                    deadline,
                    epoch,
                    flushing: false,
                });
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    inner.run(id, epoch, deadline).await;
                });
            }
        }
    }

    /// Returns `true` if a flush is currently pending for the product.
    #[must_use]
    pub fn armed(&self, id: ProductId) -> bool {
        self.inner.timers.contains_key(&id)
    }

    /// Returns the number of products with a pending flush.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.inner.timers.len()
    }

    /// Returns the configured quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Immediately flushes every armed product and disarms its timer.
    ///
    /// Products whose worker is already mid-flush are skipped; their write is
    /// in flight anyway. Intended for orderly shutdown — callers should stop
    /// issuing mutations before draining, otherwise a mutation racing this
    /// call may arm a fresh timer that outlives it.
    pub async fn flush_all(&self) {
        let armed: Vec<ProductId> = self.inner.timers.iter().map(|entry| *entry.key()).collect();
        for id in armed {
            if self.inner.timers.remove_if(&id, |_, timer| !timer.flushing).is_none() {
                continue;
            }
            if let Err(error) = (self.inner.flush)(id).await {
                warn!(product = %id, %error, "shutdown flush failed, dropping write");
            }
        }
    }
}

impl Inner {
    /// Worker task owning the timer for one product. At most one worker per
    /// product is live at a time; the epoch check makes a worker whose entry
    /// was removed (and possibly re-created) step aside.
    async fn run(&self, id: ProductId, epoch: u64, mut target: Instant) {
        loop {
            tokio::time::sleep_until(target).await;

            let Some(timer) = self.timers.get(&id).map(|t| *t) else {
                return;
            };
            if timer.epoch != epoch {
                return;
            }
            if timer.deadline > target {
                // Re-armed while we slept; wait out the new quiet period.
                target = timer.deadline;
                continue;
            }

            {
                let Some(mut armed) = self.timers.get_mut(&id) else {
                    return;
                };
                if armed.epoch != epoch {
                    return;
                }
                armed.flushing = true;
            }

            debug!(product = %id, "quiet period elapsed, flushing to backing store");
            if let Err(error) = (self.flush)(id).await {
                warn!(product = %id, %error, "debounced flush failed, dropping write; cache stays authoritative");
            }

            // Disarm, unless a re-arm landed while the flush was in flight;
            // then the next cycle starts now that the flush has completed.
            if self
                .timers
                .remove_if(&id, |_, timer| timer.epoch == epoch && timer.deadline <= target)
                .is_some()
            {
                return;
            }
            match self.timers.get_mut(&id) {
                Some(mut armed) if armed.epoch == epoch => {
                    armed.flushing = false;
                    target = armed.deadline;
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use parking_lot::Mutex;

    /// Flush callback that records each fired product, with optional
    /// scripted failures.
    fn recording_flush(log: Arc<Mutex<Vec<ProductId>>>) -> FlushFn {
        Arc::new(move |id| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(id);
                Ok(())
            }
            .boxed()
        })
    }

    async fn drain() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_quiet_period() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let debouncer = FlushDebouncer::new(Duration::from_millis(500), recording_flush(Arc::clone(&log)));

        debouncer.arm(ProductId::from(1));
        assert!(debouncer.armed(ProductId::from(1)));

        tokio::time::advance(Duration::from_millis(499)).await;
        drain().await;
        assert!(log.lock().is_empty());

        tokio::time::advance(Duration::from_millis(2)).await;
        drain().await;
        assert_eq!(*log.lock(), vec![ProductId::from(1)]);
        assert!(!debouncer.armed(ProductId::from(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_resets_the_countdown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let debouncer = FlushDebouncer::new(Duration::from_millis(500), recording_flush(Arc::clone(&log)));

        debouncer.arm(ProductId::from(7));
        tokio::time::advance(Duration::from_millis(400)).await;
        debouncer.arm(ProductId::from(7));

        // The original deadline passes without a flush.
        tokio::time::advance(Duration::from_millis(200)).await;
        drain().await;
        assert!(log.lock().is_empty());

        // The reset deadline fires exactly once.
        tokio::time::advance(Duration::from_millis(301)).await;
        drain().await;
        assert_eq!(*log.lock(), vec![ProductId::from(7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_products_do_not_interfere() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let debouncer = FlushDebouncer::new(Duration::from_millis(500), recording_flush(Arc::clone(&log)));

        debouncer.arm(ProductId::from(1));
        tokio::time::advance(Duration::from_millis(250)).await;
        debouncer.arm(ProductId::from(2));
        assert_eq!(debouncer.armed_count(), 2);

        tokio::time::advance(Duration::from_millis(251)).await;
        drain().await;
        assert_eq!(*log.lock(), vec![ProductId::from(1)]);

        tokio::time::advance(Duration::from_millis(250)).await;
        drain().await;
        assert_eq!(*log.lock(), vec![ProductId::from(1), ProductId::from(2)]);
        assert_eq!(debouncer.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_flush_disarms_and_the_next_cycle_retries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let fail_first = Arc::new(Mutex::new(true));
        let flush: FlushFn = {
            let log = Arc::clone(&log);
            let fail_first = Arc::clone(&fail_first);
            Arc::new(move |id| {
                let log = Arc::clone(&log);
                let fail_first = Arc::clone(&fail_first);
                async move {
                    if std::mem::take(&mut *fail_first.lock()) {
                        return Err(shelf_store::Error::from_message("store down"));
                    }
                    log.lock().push(id);
                    Ok(())
                }
                .boxed()
            })
        };
        let debouncer = FlushDebouncer::new(Duration::from_millis(500), flush);

        debouncer.arm(ProductId::from(3));
        tokio::time::advance(Duration::from_millis(501)).await;
        drain().await;
        // First flush failed and was dropped.
        assert!(log.lock().is_empty());
        assert!(!debouncer.armed(ProductId::from(3)));

        debouncer.arm(ProductId::from(3));
        tokio::time::advance(Duration::from_millis(501)).await;
        drain().await;
        assert_eq!(*log.lock(), vec![ProductId::from(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_all_drains_every_pending_timer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let debouncer = FlushDebouncer::new(Duration::from_millis(500), recording_flush(Arc::clone(&log)));

        debouncer.arm(ProductId::from(1));
        debouncer.arm(ProductId::from(2));
        debouncer.flush_all().await;

        let mut flushed = log.lock().clone();
        flushed.sort_unstable();
        assert_eq!(flushed, vec![ProductId::from(1), ProductId::from(2)]);
        assert_eq!(debouncer.armed_count(), 0);

        // The workers wake later, find their entries gone, and do nothing.
        tokio::time::advance(Duration::from_millis(501)).await;
        drain().await;
        assert_eq!(log.lock().len(), 2);
    }
}
