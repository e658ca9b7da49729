//! # Admin Resources
//!
//! The closed set of server resources the admin panel caches, the events that
//! announce them and the [`AdminSchema`] binding both to the cache framework.
//!
//! | resource | request target | event |
//! |----------|----------------|-------|
//! | `active_business` | `/get_storage_info/id/{business}` | `BusinessChanged` |
//! | `business_list` | `/info_about_businesses` | `BusinessListUpdated` |
//! | `storage_statistics` | `/get_statistics/id/{business}` | `StatisticsUpdated` |
//! | `pending_orders` | `/get_orders/{business}` | `PendingOrdersUpdated` |
//! | `order_in_progress` | `/expand_order/id/{order}` | `ActualOrderSelected` |
//! | `history_order` | `/expand_history_order/id/{order}` | none |
//! | `producers_and_models` | `/get_producents_and_models` | `CatalogUpdated` |

mod registry;

pub use registry::build_registry;

use crate::context::SessionContext;
use crate::model::{
    BusinessInfo, HistoryOrder, OrderDescription, PendingOrder, ProducersAndModels, StatisticsRow,
};
use cache_framework::{CacheClient, CacheSchema, EventBus};
use std::fmt::{self, Display};

/// Resource names.
pub mod names {
    pub const ACTIVE_BUSINESS: &str = "active_business";
    pub const BUSINESS_LIST: &str = "business_list";
    pub const STORAGE_STATISTICS: &str = "storage_statistics";
    pub const PENDING_ORDERS: &str = "pending_orders";
    pub const ORDER_IN_PROGRESS: &str = "order_in_progress";
    pub const HISTORY_ORDER: &str = "history_order";
    pub const PRODUCERS_AND_MODELS: &str = "producers_and_models";
}

/// Events published on the admin bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminEvent {
    BusinessChanged,
    BusinessListUpdated,
    StatisticsUpdated,
    PendingOrdersUpdated,
    ActualOrderSelected,
    CatalogUpdated,
    /// Payload-less: every consumer should re-request its resources.
    StateInvalidated,
}

impl Display for AdminEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdminEvent::BusinessChanged => "business_changed",
            AdminEvent::BusinessListUpdated => "business_list_updated",
            AdminEvent::StatisticsUpdated => "statistics_updated",
            AdminEvent::PendingOrdersUpdated => "pending_orders_updated",
            AdminEvent::ActualOrderSelected => "actual_order_selected",
            AdminEvent::CatalogUpdated => "catalog_updated",
            AdminEvent::StateInvalidated => "state_invalidated",
        };
        f.write_str(name)
    }
}

/// Normalized data, one variant per resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    ActiveBusiness(BusinessInfo),
    /// Names of every known business.
    BusinessList(Vec<String>),
    StorageStatistics(Vec<StatisticsRow>),
    PendingOrders(Vec<PendingOrder>),
    /// `None` when the server no longer knows the selected order.
    ActualOrder(Option<OrderDescription>),
    HistoryOrder(HistoryOrder),
    Catalog(ProducersAndModels),
}

impl ResourceData {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceData::ActiveBusiness(_) => "active business",
            ResourceData::BusinessList(_) => "business list",
            ResourceData::StorageStatistics(_) => "storage statistics",
            ResourceData::PendingOrders(_) => "pending orders",
            ResourceData::ActualOrder(_) => "order in progress",
            ResourceData::HistoryOrder(_) => "history order",
            ResourceData::Catalog(_) => "catalog",
        }
    }

    pub fn as_business_list(&self) -> Option<&[String]> {
        match self {
            ResourceData::BusinessList(names) => Some(names),
            _ => None,
        }
    }

    pub fn as_statistics(&self) -> Option<&[StatisticsRow]> {
        match self {
            ResourceData::StorageStatistics(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_active_business(&self) -> Option<&BusinessInfo> {
        match self {
            ResourceData::ActiveBusiness(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_pending_orders(&self) -> Option<&[PendingOrder]> {
        match self {
            ResourceData::PendingOrders(orders) => Some(orders),
            _ => None,
        }
    }

    /// The loaded order, or `None` for any other data (or a vanished order).
    pub fn as_order(&self) -> Option<&OrderDescription> {
        match self {
            ResourceData::ActualOrder(order) => order.as_ref(),
            _ => None,
        }
    }

    pub fn as_order_mut(&mut self) -> Option<&mut OrderDescription> {
        match self {
            ResourceData::ActualOrder(order) => order.as_mut(),
            _ => None,
        }
    }

    pub fn as_history_order(&self) -> Option<&HistoryOrder> {
        match self {
            ResourceData::HistoryOrder(history) => Some(history),
            _ => None,
        }
    }

    pub fn as_catalog(&self) -> Option<&ProducersAndModels> {
        match self {
            ResourceData::Catalog(catalog) => Some(catalog),
            _ => None,
        }
    }
}

/// Binds the admin panel's types to the cache framework.
pub struct AdminSchema;

impl CacheSchema for AdminSchema {
    type Context = SessionContext;
    type Value = ResourceData;
    type Event = AdminEvent;
    const STATE_INVALIDATED: AdminEvent = AdminEvent::StateInvalidated;
}

pub type AdminBus = EventBus<AdminEvent, ResourceData>;
pub type AdminClient = CacheClient<AdminSchema>;
