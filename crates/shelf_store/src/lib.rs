// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Boundary types for the slow, authoritative stock store.
//!
//! This crate defines the [`StockStore`] trait that the `shelf` cache fronts,
//! along with the [`ProductId`] key type and [`Error`] types for fallible
//! store operations. The store itself is an external system; this crate only
//! specifies the contract it must satisfy.
//!
//! # Implementing a Stock Store
//!
//! ```
//! use shelf_store::{Error, ProductId, StockStore};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct Warehouse(RwLock<HashMap<ProductId, i64>>);
//!
//! impl StockStore for Warehouse {
//!     async fn get_stock(&self, id: ProductId) -> Result<i64, Error> {
//!         Ok(self.0.read().unwrap().get(&id).copied().unwrap_or(0))
//!     }
//!
//!     async fn set_stock(&self, id: ProductId, quantity: i64) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(id, quantity);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Testing
//!
//! Enable the `test-util` feature for [`testing::MockStore`], a configurable
//! in-memory store with operation recording, failure injection, and latency
//! simulation.

pub mod error;
mod key;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use key::ProductId;
#[doc(inline)]
pub use store::StockStore;
