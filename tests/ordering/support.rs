//! Shared fixtures: a tracing subscriber, order items and a ready service.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use sourced_ordering::ordering::commands::CREATE_ORDER;
use sourced_ordering::ordering::{ordering_service, Item};
use sourced_ordering::{InMemoryDatabase, RequestContext, Service, ServiceConfig};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn items() -> Vec<Item> {
    vec![
        Item {
            store_id: "store-1".into(),
            product_id: "apple".into(),
            store_name: "Fruit Stand".into(),
            product_name: "Apple".into(),
            price: 0.5,
            quantity: 4,
        },
        Item {
            store_id: "store-2".into(),
            product_id: "bread".into(),
            store_name: "Bakery".into(),
            product_name: "Bread".into(),
            price: 3.0,
            quantity: 1,
        },
    ]
}

pub fn create_input(id: &str) -> Value {
    json!({
        "id": id,
        "customer_id": "customer-1",
        "payment_id": "payment-1",
        "items": items(),
    })
}

pub fn service() -> Service<InMemoryDatabase> {
    service_with(&ServiceConfig::default())
}

pub fn service_with(config: &ServiceConfig) -> Service<InMemoryDatabase> {
    init_tracing();
    ordering_service(InMemoryDatabase::new(), config)
}

/// A service holding one freshly created order.
pub fn service_with_order(id: &str) -> Service<InMemoryDatabase> {
    let service = service();
    service
        .dispatch(CREATE_ORDER, create_input(id), RequestContext::new())
        .unwrap();
    service
}

pub fn stream(id: &str) -> String {
    format!("Order:{id}")
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
