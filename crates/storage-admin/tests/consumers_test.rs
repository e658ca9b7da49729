mod common;

use cache_framework::{CacheError, TransportError};
use common::{
    business_list, catalog, order, pending_orders, posts, start, statistics, storage_info,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use storage_admin::resources::names::*;
use storage_admin::resources::AdminEvent;

fn serials(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn test_storage_manager_asks_for_a_selection() {
    let h = start(None);
    h.mock
        .expect_get("/info_about_businesses")
        .return_ok(business_list(&["Acme", "Globex"]));
    h.mock
        .expect_get("/get_producents_and_models")
        .return_ok(catalog());
    let storage = h.system.storage_manager();

    h.system.coordinator.refresh_all().await.unwrap();

    let view = storage.view();
    assert_eq!(view.businesses, vec!["Acme", "Globex"]);
    assert!(view.selection_needed);
    assert!(view.statistics.is_empty());
    h.mock.verify();
}

#[tokio::test]
async fn test_storage_manager_renders_after_switch() {
    let h = start(None);
    h.mock
        .expect_get("/info_about_businesses")
        .return_ok(business_list(&["Acme", "Globex"]));
    h.mock
        .expect_get("/get_producents_and_models")
        .return_ok(catalog());
    h.mock
        .expect_get("/get_storage_info/id/Acme")
        .return_ok(storage_info("Acme"));
    h.mock
        .expect_get("/get_statistics/id/Acme")
        .return_ok(statistics());
    let storage = h.system.storage_manager();

    storage.switch_business("Acme").await.unwrap();

    let view = storage.view();
    assert!(!view.selection_needed);
    assert_eq!(view.active_business.unwrap().name, "Acme");
    assert_eq!(view.existing_types, vec!["Router", "Switch"]);
    assert_eq!(view.statistics[1].count, 5);
    assert!(view.statistics[0].is_critical());
    assert_eq!(view.producers, vec!["Juniper", "Mikrotik"]);
    assert_eq!(view.models, vec!["EX2200", "RB951"]);
    assert_eq!(h.mock.request_count(), 4);
    h.mock.verify();
}

#[tokio::test]
async fn test_add_product_refetches_only_statistics() {
    let h = start(Some("Acme"));
    h.mock
        .expect_get("/info_about_businesses")
        .return_ok(business_list(&["Acme"]));
    h.mock
        .expect_get("/get_producents_and_models")
        .return_ok(catalog());
    h.mock
        .expect_get("/get_storage_info/id/Acme")
        .return_ok(storage_info("Acme"));
    h.mock
        .expect_get("/get_statistics/id/Acme")
        .return_ok(statistics());
    let storage = h.system.storage_manager();
    h.system.coordinator.refresh_all().await.unwrap();

    h.mock
        .expect_post("/add_items_on_storage/id/Acme")
        .return_ok(json!("ok"));
    h.mock.expect_get("/get_statistics/id/Acme").return_ok(json!([
        { "Тип": "Router", "К-во": 4, "К-во исправных": 3, "Заказано": 1 },
        { "Тип": "Modem", "К-во": 1, "К-во исправных": 1, "Заказано": 0 }
    ]));

    let product = storage_admin::model::NewProduct::new("SN-9", "Modem", "M-1", "Zyxel");
    storage.add_product(&product).await.unwrap();

    assert_eq!(storage.view().existing_types, vec!["Router", "Modem"]);
    assert_eq!(h.mock.count_for("/get_statistics/id/Acme"), 2);
    assert_eq!(h.mock.count_for("/get_storage_info/id/Acme"), 1);
    assert_eq!(h.mock.count_for("/info_about_businesses"), 1);
    assert_eq!(h.mock.count_for("/get_producents_and_models"), 1);
    h.mock.verify();
}

#[tokio::test]
async fn test_refresh_error_is_returned_but_switch_stays_committed() {
    let h = start(None);
    h.mock
        .expect_get("/info_about_businesses")
        .return_ok(business_list(&["Acme"]));
    h.mock
        .expect_get("/get_producents_and_models")
        .return_ok(catalog());
    h.mock
        .expect_get("/get_storage_info/id/Acme")
        .return_err(TransportError::with_status(500, "Internal server error"));
    let _storage = h.system.storage_manager();

    let err = h.system.coordinator.switch_business("Acme").await.unwrap_err();

    assert_eq!(
        err,
        CacheError::Fetch {
            endpoint: "/get_storage_info/id/Acme".into(),
            message: "Internal server error (HTTP 500)".into(),
        }
    );
    assert_eq!(h.system.coordinator.context().business(), Some("Acme"));
    assert!(!h.system.cache.is_actual(ACTIVE_BUSINESS).await.unwrap());
    assert_eq!(h.indicator.transitions(), vec![true, false]);
}

#[tokio::test]
async fn test_dropped_consumer_unsubscribes() {
    let h = start(None);
    let storage = h.system.storage_manager();
    let bus = &h.system.bus;
    assert_eq!(bus.subscriber_count(AdminEvent::BusinessListUpdated), 1);
    assert_eq!(bus.subscriber_count(AdminEvent::StatisticsUpdated), 1);
    assert_eq!(bus.subscriber_count(AdminEvent::CatalogUpdated), 1);
    // Refresh runs through the coordinator, not through the bus signal.
    assert_eq!(bus.subscriber_count(AdminEvent::StateInvalidated), 0);

    drop(storage);

    assert_eq!(bus.subscriber_count(AdminEvent::BusinessListUpdated), 0);
    assert_eq!(bus.subscriber_count(AdminEvent::StatisticsUpdated), 0);
    assert_eq!(bus.subscriber_count(AdminEvent::CatalogUpdated), 0);
    h.system.coordinator.refresh_all().await.unwrap();
    assert_eq!(h.mock.request_count(), 0);
}

#[tokio::test]
async fn test_order_editor_edits_and_submits() {
    let h = start(Some("Acme"));
    h.mock
        .expect_get("/get_orders/Acme")
        .return_ok(pending_orders());
    h.mock
        .expect_get("/expand_order/id/12")
        .return_ok(order(&["R-1"], &["R-2", "R-3"]));
    let editor = h.system.order_editor();

    editor.select_order(12).await.unwrap();

    let view = editor.view();
    assert_eq!(view.pending_orders[0].id, 12);
    let loaded = view.order.unwrap();
    assert_eq!(loaded.bound, serials(&["R-1"]));
    assert_eq!(loaded.unbound, serials(&["R-2", "R-3"]));

    editor.bind("R-2").await.unwrap();
    editor.unbind("R-1").await.unwrap();
    editor.set_ordered("Router", 1).await.unwrap();
    assert_eq!(editor.view().order.unwrap().bound, serials(&["R-2"]));
    assert_eq!(h.mock.request_count(), 2);

    h.mock.expect_post("/edit_order/id/12").return_ok(json!("ok"));
    h.mock.expect_get("/get_orders/Acme").return_ok(json!([]));
    h.mock
        .expect_get("/expand_order/id/12")
        .return_ok(order(&["R-2"], &["R-1", "R-3"]));

    editor.submit().await.unwrap();

    assert_eq!(
        posts(&h.mock)[0].body,
        Some(json!({
            "order_types": { "Router": 1 },
            "binded_products": ["R-2"],
            "unbinded_products": ["R-1", "R-3"]
        }))
    );
    let view = editor.view();
    assert!(view.pending_orders.is_empty());
    assert_eq!(view.order.unwrap().bound, serials(&["R-2"]));
    assert!(!h.system.cache.is_actual(STORAGE_STATISTICS).await.unwrap());
    h.mock.verify();
}

#[tokio::test]
async fn test_order_edits_are_checked() {
    let h = start(Some("Acme"));
    h.mock.expect_get("/get_orders/Acme").return_ok(json!([]));
    h.mock
        .expect_get("/expand_order/id/12")
        .return_ok(order(&[], &["R-1"]));
    let editor = h.system.order_editor();
    editor.select_order(12).await.unwrap();

    let err = editor.bind("X-404").await.unwrap_err();
    assert_eq!(
        err,
        CacheError::Validation("product X-404 is not available for this order".into())
    );
    let err = editor.set_ordered("  ", 2).await.unwrap_err();
    assert_eq!(err, CacheError::Validation("type name is required".into()));

    assert_eq!(editor.view().order.unwrap().unbound, serials(&["R-1"]));
}

#[tokio::test]
async fn test_vanished_order() {
    let h = start(Some("Acme"));
    h.mock.expect_get("/get_orders/Acme").return_ok(json!([]));
    h.mock.expect_get("/expand_order/id/12").return_ok(Value::Null);
    let editor = h.system.order_editor();

    editor.select_order(12).await.unwrap();

    let view = editor.view();
    assert!(view.order_vanished);
    assert!(view.order.is_none());
    assert!(matches!(
        editor.bind("R-1").await,
        Err(CacheError::Validation(_))
    ));
    assert!(matches!(
        h.system.coordinator.submit_order_changes().await,
        Err(CacheError::Validation(_))
    ));
}

#[tokio::test]
async fn test_switching_business_drops_the_order() {
    let h = start(Some("Acme"));
    h.mock.expect_get("/get_orders/Acme").return_ok(pending_orders());
    h.mock
        .expect_get("/expand_order/id/12")
        .return_ok(order(&["R-1"], &[]));
    h.mock
        .expect_get("/expand_history_order/id/3")
        .return_ok(json!({ "order_stats": [{ "Type": "Router", "Sold": 2 }] }));
    h.mock
        .expect_get("/info_about_businesses")
        .return_ok(business_list(&["Acme", "Globex"]));
    h.mock.expect_get("/get_orders/Globex").return_ok(json!([]));
    let editor = h.system.order_editor();
    editor.select_order(12).await.unwrap();
    editor.show_history(3).await.unwrap();
    assert_eq!(editor.view().history.unwrap().total_sold(), 2);

    h.system.coordinator.switch_business("Globex").await.unwrap();

    let view = editor.view();
    assert!(view.selection_needed);
    assert!(view.order.is_none());
    assert!(view.history.is_none());
    assert!(view.pending_orders.is_empty());
    h.mock.verify();
}

#[tokio::test]
async fn test_catalog_update_reaches_the_storage_view() {
    let h = start(None);
    h.mock
        .expect_get("/get_producents_and_models")
        .return_ok(json!({ "models": [{ "model": "M-1" }], "producents": [] }));
    let storage = h.system.storage_manager();

    h.system
        .cache
        .ensure_fresh(PRODUCERS_AND_MODELS, h.system.coordinator.context())
        .await
        .unwrap();

    let view = storage.view();
    assert_eq!(view.models, vec!["M-1"]);
    assert!(view.producers.is_empty());
    h.mock.verify();
}

#[tokio::test]
async fn test_completing_an_order_clears_the_editor() {
    let h = start(Some("Acme"));
    h.mock.expect_get("/get_orders/Acme").return_ok(pending_orders());
    h.mock
        .expect_get("/expand_order/id/12")
        .return_ok(order(&["R-1"], &["R-2"]));
    let editor = h.system.order_editor();
    editor.select_order(12).await.unwrap();

    h.mock
        .expect_post("/complete_order/id/12")
        .return_ok(json!("ok"));
    h.mock.expect_get("/get_orders/Acme").return_ok(json!([]));

    editor.complete().await.unwrap();

    assert_eq!(
        posts(&h.mock)[0].body,
        Some(json!({ "products": ["R-1"], "customer": "Globex" }))
    );
    let view = editor.view();
    assert!(view.selection_needed);
    assert!(view.order.is_none());
    assert!(view.pending_orders.is_empty());
    assert_eq!(h.mock.count_for("/expand_order/id/12"), 1);
    h.mock.verify();
}
