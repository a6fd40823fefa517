// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for shelf operations.

use shelf_store::ProductId;

/// An error from a shelf operation.
///
/// Read-path store failures surface here because a cache-miss load has no
/// cached value to fall back on. Write-path (flush) failures never do: the
/// flush is asynchronous and detached from the request that armed it, so a
/// failed flush is logged and dropped while the cache remains the in-memory
/// source of truth.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A retrieval was rejected because it would drive the cached quantity
    /// negative. Only produced under [`RetrievalPolicy::Strict`]; the cache
    /// is left unchanged.
    ///
    /// [`RetrievalPolicy::Strict`]: crate::RetrievalPolicy::Strict
    #[error("insufficient stock for product {id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// The product the retrieval targeted.
        id: ProductId,
        /// The quantity the retrieval asked for.
        requested: i64,
        /// The cached quantity at the time of rejection.
        available: i64,
    },

    /// The backing store failed while loading a product that was not yet
    /// cached.
    #[error("backing store unavailable")]
    Store(#[from] shelf_store::Error),
}

/// A specialized [`Result`] type for shelf operations.
pub type Result<T> = std::result::Result<T, Error>;
