//! Integration tests for the catalog against the in-memory document store,
//! mounted through a real session.

use std::sync::Arc;

use keystone_catalog::{Catalog, CatalogError, Category, Order, OrderStatus, Product};
use keystone_protocol::Destination;
use keystone_remote::{MemoryDocumentStore, MemoryIdentityGateway, RemoteError};
use keystone_session::{MemoryCache, SessionConfig, SessionState, SessionStore};
use serde_json::json;

const ADMIN: &str = "admin@techinf.com";

async fn admin_session() -> SessionState {
    let store = SessionStore::start(
        SessionConfig::default(),
        Arc::new(MemoryIdentityGateway::new().with_account(ADMIN, "secret")),
        Arc::new(MemoryDocumentStore::new()),
        MemoryCache::new(),
    );
    let state = store.login(ADMIN, "secret").await;
    assert!(state.is_logged_in());
    state
}

async fn mount(
    destination: Destination,
    documents: &Arc<MemoryDocumentStore>,
) -> Catalog<MemoryDocumentStore> {
    Catalog::mount(destination, &admin_session().await, Arc::clone(documents)).unwrap()
}

fn orders_fixture() -> MemoryDocumentStore {
    MemoryDocumentStore::with_root(json!({
        "orders": {
            "o-old": { "status": "placed", "orderDate": "2024-01-02T09:00:00.000Z", "totalAmount": 10 },
            "o-new": { "status": "processing", "orderDate": "2024-03-05T09:00:00.000Z", "totalAmount": "25.5" },
            "o-done": { "status": "Delivered", "orderDate": "2024-02-01T09:00:00.000Z" },
            "o-undated": { "status": "pending" }
        }
    }))
}

// ---------------------------------------------------------------------------
// Mount
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_mount_anonymous_session_is_denied() {
    let documents = Arc::new(MemoryDocumentStore::new());

    let result = Catalog::mount(Destination::Orders, &SessionState::default(), documents);

    assert!(matches!(result, Err(CatalogError::AccessDenied(Destination::Orders))));
}

#[tokio::test]
async fn test_mount_admin_session_is_allowed() {
    let documents = Arc::new(MemoryDocumentStore::new());

    let catalog = mount(Destination::Products, &documents).await;

    assert_eq!(catalog.destination(), Destination::Products);
}

// ---------------------------------------------------------------------------
// Categories and products
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_empty_collection_is_empty() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let catalog = mount(Destination::Categories, &documents).await;

    let categories = catalog.list::<Category>().await.unwrap();

    assert!(categories.is_empty());
}

#[tokio::test]
async fn test_create_then_list_category() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let catalog = mount(Destination::Categories, &documents).await;

    let id = catalog
        .create(&Category::new("Shoes", "https://img/shoes.png"))
        .await
        .unwrap();
    let categories = catalog.list::<Category>().await.unwrap();

    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, id);
    assert_eq!(categories[0].value.title, "Shoes");
}

#[tokio::test]
async fn test_create_invalid_record_writes_nothing() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let catalog = mount(Destination::Categories, &documents).await;

    let result = catalog.create(&Category::new("", "")).await;

    assert!(matches!(result, Err(CatalogError::Invalid { .. })));
    assert_eq!(documents.snapshot(), json!({}));
}

#[tokio::test]
async fn test_update_product_merges_fields() {
    let documents = Arc::new(MemoryDocumentStore::with_root(json!({
        "products": { "p1": { "title": "Boot", "price": "10", "sku": "B-1" } }
    })));
    let catalog = mount(Destination::Products, &documents).await;
    let edited = Product {
        title: "Boot".into(),
        description: "Leather boot".into(),
        price: 12.0,
        ..Product::default()
    };

    catalog.update("p1", &edited).await.unwrap();

    let stored = catalog.get::<Product>("p1").await.unwrap();
    assert_eq!(stored.description, "Leather boot");
    assert_eq!(stored.price, 12.0);
    assert_eq!(documents.snapshot()["products"]["p1"]["sku"], json!("B-1"));
}

#[tokio::test]
async fn test_delete_removes_record() {
    let documents = Arc::new(MemoryDocumentStore::with_root(json!({
        "categories": { "c1": { "title": "A" }, "c2": { "title": "B" } }
    })));
    let catalog = mount(Destination::Categories, &documents).await;

    catalog.delete::<Category>("c1").await.unwrap();

    let remaining = catalog.list::<Category>().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "c2");
}

#[tokio::test]
async fn test_list_skips_malformed_records() {
    let documents = Arc::new(MemoryDocumentStore::with_root(json!({
        "products": {
            "good": { "title": "Boot", "price": 5 },
            "bad": { "title": "Hat", "price": "lots" }
        }
    })));
    let catalog = mount(Destination::Products, &documents).await;

    let products = catalog.list::<Product>().await.unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, "good");
}

#[tokio::test]
async fn test_get_missing_record_is_not_found() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let catalog = mount(Destination::Products, &documents).await;

    let result = catalog.get::<Product>("nope").await;

    assert!(matches!(result, Err(CatalogError::NotFound(path)) if path == "products/nope"));
}

#[tokio::test]
async fn test_store_failure_surfaces_as_remote_error() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let catalog = mount(Destination::Categories, &documents).await;
    documents.set_write_failure(true);

    let result = catalog.create(&Category::new("Shoes", "")).await;

    assert!(matches!(result, Err(CatalogError::Remote(RemoteError::Network(_)))));
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_orders_sorted_newest_first() {
    let documents = Arc::new(orders_fixture());
    let catalog = mount(Destination::Orders, &documents).await;

    let orders = catalog.orders().await.unwrap();

    let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["o-new", "o-done", "o-old", "o-undated"]);
    assert_eq!(orders[0].value.total_amount, 25.5);
}

#[tokio::test]
async fn test_update_status_writes_status_and_timestamp() {
    let documents = Arc::new(orders_fixture());
    let catalog = mount(Destination::Orders, &documents).await;

    catalog.update_status("o-old", OrderStatus::Processing).await.unwrap();

    let order = catalog.get::<Order>("o-old").await.unwrap();
    assert_eq!(order.status, Some(OrderStatus::Processing));
    assert!(order.last_updated.is_some());
    assert_eq!(order.total_amount, 10.0);
}

#[tokio::test]
async fn test_update_status_terminal_order_is_refused() {
    let documents = Arc::new(orders_fixture());
    let catalog = mount(Destination::Orders, &documents).await;

    let result = catalog.update_status("o-done", OrderStatus::Cancelled).await;

    assert!(matches!(
        result,
        Err(CatalogError::TerminalStatus { status: OrderStatus::Delivered, .. })
    ));
    let order = catalog.get::<Order>("o-done").await.unwrap();
    assert_eq!(order.last_updated, None);
}

#[tokio::test]
async fn test_update_status_missing_order_is_not_found() {
    let documents = Arc::new(orders_fixture());
    let catalog = mount(Destination::Orders, &documents).await;

    let result = catalog.update_status("o-ghost", OrderStatus::Placed).await;

    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}
