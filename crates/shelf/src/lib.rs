// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A write-coalescing in-memory cache fronting a slow stock store.
//!
//! The upstream inventory system answers in hundreds of milliseconds to
//! seconds. This crate absorbs read and write traffic in front of it:
//!
//! - [`StockCache`] is a read-through cache of stock quantities with atomic
//!   per-product mutations, so committed reads never observe stale data.
//! - [`FlushDebouncer`] coalesces bursts of mutations on the same product
//!   into a single deferred write-back, bounding the upstream write rate
//!   per product while bounding staleness by a fixed quiet period.
//! - [`Shelf`] ties the two together and exposes the three operations:
//!   `get_stock`, `retrieve`, and `restock`.
//!
//! The cache is the single source of truth for what the system currently
//! believes the stock is; the store is eventually, not immediately,
//! consistent with it.
//!
//! # Example
//!
//! ```
//! use shelf::{ProductId, Shelf};
//! use shelf_store::testing::MockStore;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), shelf::Error> {
//! let store = MockStore::with_data([(ProductId::from(3), 10)]);
//! let shelf = Shelf::builder(store)
//!     .flush_delay(Duration::from_millis(500))
//!     .build();
//!
//! shelf.restock(ProductId::from(3), 5).await?;
//! // The cache commits synchronously; the store catches up after the
//! // quiet period elapses.
//! assert_eq!(shelf.get_stock(ProductId::from(3)).await?, 15);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod debounce;
mod error;
mod front;

#[doc(inline)]
pub use builder::{DEFAULT_FLUSH_DELAY, ShelfBuilder};
#[doc(inline)]
pub use cache::StockCache;
#[doc(inline)]
pub use debounce::{FlushDebouncer, FlushFn};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use front::{RetrievalPolicy, Shelf};
#[doc(inline)]
pub use shelf_store::{ProductId, StockStore};
