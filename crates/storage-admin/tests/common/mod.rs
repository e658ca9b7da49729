#![allow(dead_code)]

use cache_framework::mock::{MockTransport, RecordedRequest, RecordingIndicator};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use storage_admin::resources::{AdminBus, AdminEvent, ResourceData};
use storage_admin::{AdminConfig, AdminSystem};

pub struct Harness {
    pub mock: MockTransport,
    pub indicator: Arc<RecordingIndicator>,
    pub system: AdminSystem,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Starts a system on a fresh mock, optionally with a business selected.
pub fn start(business: Option<&str>) -> Harness {
    init_tracing();
    let mock = MockTransport::new();
    let indicator = Arc::new(RecordingIndicator::default());
    let config = AdminConfig {
        channel_capacity: 16,
        initial_business: business.map(String::from),
        ..AdminConfig::default()
    };
    let system =
        AdminSystem::with_transport(&config, Arc::new(mock.clone()), indicator.clone()).unwrap();
    Harness {
        mock,
        indicator,
        system,
    }
}

/// Collects every payload published for `event`.
pub fn record(bus: &AdminBus, event: AdminEvent) -> Arc<Mutex<Vec<Option<ResourceData>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(event, move |payload| sink.lock().push(payload.cloned()));
    seen
}

pub fn posts(mock: &MockTransport) -> Vec<RecordedRequest> {
    mock.requests()
        .into_iter()
        .filter(|r| r.method == cache_framework::mock::Method::Post)
        .collect()
}

pub fn business_list(names: &[&str]) -> Value {
    Value::Array(names.iter().map(|name| json!({ "name": name })).collect())
}

pub fn statistics() -> Value {
    json!([
        { "Тип": "Router", "К-во": 3, "К-во исправных": 2, "Заказано": 1, "Критический уровень": 1 },
        { "Тип": "Switch", "К-во": "5", "К-во исправных": 5, "Заказано": 0, "Критический уровень": null }
    ])
}

pub fn catalog() -> Value {
    json!({
        "models": [{ "model": "RB951" }, { "model": "EX2200" }],
        "producents": [{ "producent": "Mikrotik" }, { "producent": "Juniper" }]
    })
}

pub fn storage_info(name: &str) -> Value {
    json!({ "name": name, "is_service": false })
}

pub fn order(bound: &[&str], unbound: &[&str]) -> Value {
    let product = |serial: &&str, bound_to: Value| {
        json!({ "Тип": "Router", "Серийный номер": serial, "Привязан к заказу": bound_to })
    };
    let products: Vec<Value> = bound
        .iter()
        .map(|serial| product(serial, json!(12)))
        .chain(unbound.iter().map(|serial| product(serial, Value::Null)))
        .collect();
    json!({
        "order_sides": { "Поставщик": "Acme", "Клиент": "Globex" },
        "order_stats": { "Router": { "Тип": "Router", "Заказано": 2 } },
        "available_products": products
    })
}

pub fn pending_orders() -> Value {
    json!([
        { "Ид заказа": 12, "Дата заказа": "2021-03-01", "Клиент": "Globex", "Поставщик": "Acme" }
    ])
}
