//! Stock decrement behavior under contention.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use bazaar_integration_tests::TestDb;
use bazaar_storefront::db::{CatalogStore, ProductRepository, StockDecrement};
use bazaar_core::ProductId;

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_decrement_is_conditional() {
    let db = TestDb::connect().await;
    let product = db.product("Brass Lamp", 100, 3).await;
    let catalog = &db.stores.catalog;

    assert_eq!(
        catalog.decrement_stock(product.id, 2).await.unwrap(),
        StockDecrement::Decremented { remaining: 1 }
    );
    assert_eq!(
        catalog.decrement_stock(product.id, 2).await.unwrap(),
        StockDecrement::Insufficient { available: 1 }
    );
    assert_eq!(
        catalog
            .decrement_stock(ProductId::new(i32::MAX), 1)
            .await
            .unwrap(),
        StockDecrement::NotFound
    );

    catalog.restock(product.id, 2).await.unwrap();
    let stored = catalog.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(stored.stock, 3);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_concurrent_decrements_never_oversell() {
    let db = TestDb::connect().await;
    let product = db.product("Silk Saree", 400, 10).await;
    let repo = Arc::new(ProductRepository::new(db.pool.clone()));

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.decrement_stock(product.id, 1).await.unwrap() })
        })
        .collect();

    let mut sold = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), StockDecrement::Decremented { .. }) {
            sold += 1;
        }
    }

    assert_eq!(sold, 10);
    let stored = repo.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(stored.stock, 0);
}
