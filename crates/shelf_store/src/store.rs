// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for the authoritative stock store.
//!
//! [`StockStore`] defines the interface of the slow upstream inventory
//! system. Both operations are expected to take hundreds of milliseconds to
//! seconds; callers front the store with a cache rather than hitting it on
//! every request.

use crate::{Error, ProductId};

/// The slow, authoritative inventory-stock service.
///
/// Each call is individually atomic from the store's perspective, but the
/// store is not transactional with any state the caller keeps in memory.
/// Implementations must be safe to call from any number of tasks.
pub trait StockStore: Send + Sync {
    /// Reads the current stock quantity for a product.
    ///
    /// Products the store has never seen report a quantity of zero.
    fn get_stock(&self, id: ProductId) -> impl Future<Output = Result<i64, Error>> + Send;

    /// Overwrites the stock quantity for a product.
    fn set_stock(&self, id: ProductId, quantity: i64) -> impl Future<Output = Result<(), Error>> + Send;
}

impl<S> StockStore for &S
where
    S: StockStore,
{
    fn get_stock(&self, id: ProductId) -> impl Future<Output = Result<i64, Error>> + Send {
        (**self).get_stock(id)
    }

    fn set_stock(&self, id: ProductId, quantity: i64) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).set_stock(id, quantity)
    }
}

impl<S> StockStore for std::sync::Arc<S>
where
    S: StockStore,
{
    fn get_stock(&self, id: ProductId) -> impl Future<Output = Result<i64, Error>> + Send {
        (**self).get_stock(id)
    }

    fn set_stock(&self, id: ProductId, quantity: i64) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).set_stock(id, quantity)
    }
}
