use super::names::*;
use super::{AdminEvent, AdminSchema, ResourceData};
use crate::context::SessionContext;
use crate::model::{BusinessEntry, OrderId, RawOrderDescription};
use cache_framework::{CacheError, MissingContext, ResourceDescriptor, ResourceRegistry};
use serde_json::Value;

type Descriptor = ResourceDescriptor<AdminSchema>;

/// `{prefix}{business}`, with the business name percent-encoded.
fn business_target(
    prefix: &'static str,
) -> impl Fn(&SessionContext) -> Result<String, MissingContext> + Send + Sync + 'static {
    move |context| {
        context
            .business()
            .map(|business| format!("{prefix}{}", urlencoding::encode(business)))
            .ok_or(MissingContext("business"))
    }
}

fn order_target(
    prefix: &'static str,
    select: fn(&SessionContext) -> Option<OrderId>,
    missing: &'static str,
) -> impl Fn(&SessionContext) -> Result<String, MissingContext> + Send + Sync + 'static {
    move |context| {
        select(context)
            .map(|id| format!("{prefix}{id}"))
            .ok_or(MissingContext(missing))
    }
}

fn fixed_target(
    target: &'static str,
) -> impl Fn(&SessionContext) -> Result<String, MissingContext> + Send + Sync + 'static {
    move |_| Ok(target.to_string())
}

/// A `null` body means the selected order no longer exists on the server.
fn process_order(raw: Value) -> Result<ResourceData, String> {
    if raw.is_null() {
        return Ok(ResourceData::ActualOrder(None));
    }
    serde_json::from_value::<RawOrderDescription>(raw)
        .map(|order| ResourceData::ActualOrder(Some(order.into())))
        .map_err(|e| format!("malformed response: {e}"))
}

fn pack_order(data: &ResourceData) -> Result<Value, String> {
    let order = match data {
        ResourceData::ActualOrder(Some(order)) => order,
        ResourceData::ActualOrder(None) => return Err("the order no longer exists".to_string()),
        other => return Err(format!("expected an order, found {}", other.kind())),
    };
    serde_json::to_value(order.pack()).map_err(|e| e.to_string())
}

/// Builds the registry of every resource the admin panel uses.
pub fn build_registry() -> Result<ResourceRegistry<AdminSchema>, CacheError> {
    ResourceRegistry::builder()
        .register(
            Descriptor::decoded(
                ACTIVE_BUSINESS,
                business_target("/get_storage_info/id/"),
                ResourceData::ActiveBusiness,
            )
            .announce(AdminEvent::BusinessChanged),
        )
        .register(
            Descriptor::decoded(
                BUSINESS_LIST,
                fixed_target("/info_about_businesses"),
                |entries: Vec<BusinessEntry>| {
                    ResourceData::BusinessList(entries.into_iter().map(|e| e.name).collect())
                },
            )
            .announce(AdminEvent::BusinessListUpdated),
        )
        .register(
            Descriptor::decoded(
                STORAGE_STATISTICS,
                business_target("/get_statistics/id/"),
                ResourceData::StorageStatistics,
            )
            .announce(AdminEvent::StatisticsUpdated),
        )
        .register(
            Descriptor::decoded(
                PENDING_ORDERS,
                business_target("/get_orders/"),
                ResourceData::PendingOrders,
            )
            .announce(AdminEvent::PendingOrdersUpdated),
        )
        .register(
            Descriptor::new(
                ORDER_IN_PROGRESS,
                order_target("/expand_order/id/", |c| c.order, "order"),
                process_order,
            )
            .announce(AdminEvent::ActualOrderSelected)
            .with_packer(pack_order),
        )
        .register(Descriptor::decoded(
            HISTORY_ORDER,
            order_target("/expand_history_order/id/", |c| c.history_order, "history order"),
            ResourceData::HistoryOrder,
        ))
        .register(
            Descriptor::decoded(
                PRODUCERS_AND_MODELS,
                fixed_target("/get_producents_and_models"),
                ResourceData::Catalog,
            )
            .announce(AdminEvent::CatalogUpdated),
        )
        .build()
}
