// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

/// Identifies a stock record in the backing store.
///
/// Product ids are opaque non-negative integers. They carry no semantics
/// beyond being a map key; in particular they are not validated against any
/// catalog.
///
/// # Examples
///
/// ```
/// use shelf_store::ProductId;
///
/// let id = ProductId::from(19);
/// assert_eq!(id.to_string(), "19");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductId(u64);

impl ProductId {
    /// Creates a product id from its raw integer form.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer form of this id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProductId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<ProductId> for u64 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u64() {
        let id = ProductId::from(42);
        assert_eq!(u64::from(id), 42);
        assert_eq!(id.get(), 42);
        assert_eq!(id, ProductId::new(42));
    }

    #[test]
    fn display_matches_raw_value() {
        assert_eq!(ProductId::new(7).to_string(), "7");
    }

    #[test]
    fn orders_by_raw_value() {
        assert!(ProductId::new(1) < ProductId::new(2));
    }
}
