#![allow(dead_code)]

use checkout_engine::application::config::EngineConfig;
use checkout_engine::application::engine::OrderEngine;
use checkout_engine::domain::intake::NewOrderRequest;
use checkout_engine::infrastructure::in_memory::InMemoryOrderStore;
use checkout_engine::infrastructure::log_notifier::LogNotifier;
use checkout_engine::infrastructure::simulated_gateway::SimulatedGateway;
use serde_json::{Value, json};
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

pub const KEY_ID: &str = "rzp_test_integration";
pub const SECRET: &str = "integration_secret";

pub struct TestEngine {
    pub engine: OrderEngine,
    pub store: InMemoryOrderStore,
    pub gateway: SimulatedGateway,
}

pub fn engine() -> TestEngine {
    let store = InMemoryOrderStore::new();
    let gateway = SimulatedGateway::new(SECRET);
    let engine = OrderEngine::new(
        EngineConfig::new(KEY_ID, SECRET),
        Box::new(store.clone()),
        Box::new(gateway.clone()),
        Box::new(LogNotifier::new()),
    )
    .unwrap();
    TestEngine {
        engine,
        store,
        gateway,
    }
}

/// A storefront order payload. `items` are `(price, quantity)` pairs.
pub fn order_json(
    order_id: &str,
    payment_method: &str,
    items: &[(&str, u32)],
    shipping_cost: &str,
    coupon: Option<&str>,
    total: &str,
) -> Value {
    let items: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, (price, qty))| {
            json!({
                "productId": format!("p-{}", i + 1),
                "name": format!("Item {}", i + 1),
                "quantity": qty,
                "price": price,
            })
        })
        .collect();
    let mut order = json!({
        "orderId": order_id,
        "customer": {"name": "Asha Rao", "email": "asha@example.com", "phone": "9876543210"},
        "shippingAddress": {
            "line1": "12 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "postalCode": "560001",
            "country": "India"
        },
        "items": items,
        "shippingMethod": {"type": "Standard", "cost": shipping_cost},
        "paymentMethod": payment_method,
        "total": total,
    });
    if let Some(code) = coupon {
        order["coupon"] = json!({"code": code});
    }
    order
}

pub fn order_request(order_id: &str, payment_method: &str) -> NewOrderRequest {
    serde_json::from_value(order_json(
        order_id,
        payment_method,
        &[("100", 2), ("250", 1)],
        "50",
        None,
        "500",
    ))
    .unwrap()
}

pub fn write_requests(path: &Path, requests: &[Value]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    for request in requests {
        writeln!(file, "{}", request)?;
    }
    file.flush()?;
    Ok(())
}

pub fn create_op(order_id: &str, payment_method: &str) -> Value {
    let mut request = order_json(
        order_id,
        payment_method,
        &[("100", 2), ("250", 1)],
        "50",
        None,
        "500",
    );
    request["op"] = json!("create_order");
    request
}
