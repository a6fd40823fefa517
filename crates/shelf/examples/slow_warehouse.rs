// Copyright (c) Microsoft Corporation.

//! Slow Warehouse Example
//!
//! Fronts a simulated 2.5-second warehouse with a shelf and shows a burst of
//! mutations being served from memory and coalesced into a single upstream
//! write.

use std::{collections::HashMap, sync::RwLock, time::Duration};

use shelf::{ProductId, Shelf};
use shelf_store::{Error, StockStore};
use tracing::info;

/// A stand-in for the legacy warehouse system: authoritative, but every call
/// takes 2.5 seconds.
struct SlowWarehouse {
    records: RwLock<HashMap<ProductId, i64>>,
}

impl SlowWarehouse {
    fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::from([(ProductId::from(3), 10)])),
        }
    }
}

impl StockStore for SlowWarehouse {
    async fn get_stock(&self, id: ProductId) -> Result<i64, Error> {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        Ok(self.records.read().expect("lock poisoned").get(&id).copied().unwrap_or(0))
    }

    async fn set_stock(&self, id: ProductId, quantity: i64) -> Result<(), Error> {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        info!(product = %id, quantity, "warehouse write committed");
        self.records.write().expect("lock poisoned").insert(id, quantity);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), shelf::Error> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let shelf = Shelf::builder(SlowWarehouse::new())
        .flush_delay(Duration::from_millis(500))
        .build();

    let product = ProductId::from(3);

    // The first read pays the warehouse latency once.
    info!(stock = shelf.get_stock(product).await?, "initial stock");

    // A burst of mutations is absorbed in memory within microseconds.
    shelf.restock(product, 5).await?;
    shelf.retrieve(product, 2).await?;
    shelf.retrieve(product, 1).await?;
    info!(stock = shelf.get_stock(product).await?, "stock after burst");

    // Give the debounced write-back time to coalesce the burst into one
    // warehouse write, then drain anything still pending before exit.
    tokio::time::sleep(Duration::from_secs(4)).await;
    shelf.flush_all().await;

    Ok(())
}
