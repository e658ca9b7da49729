use super::unless_unselected;
use crate::coordinator::{MutationCoordinator, Refreshable};
use crate::model::{
    HistoryOrder, NewOrder, OrderDescription, OrderEditError, OrderId, PendingOrder,
};
use crate::resources::names::*;
use crate::resources::{AdminEvent, ResourceData};
use async_trait::async_trait;
use cache_framework::{CacheError, SubscriptionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What the order screen shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderView {
    pub pending_orders: Vec<PendingOrder>,
    /// The order being edited, with local bind/unbind changes applied.
    pub order: Option<OrderDescription>,
    /// The selected order is no longer known to the server.
    pub order_vanished: bool,
    pub history: Option<HistoryOrder>,
    /// No order is selected yet.
    pub selection_needed: bool,
}

impl OrderView {
    fn render(&mut self, data: &ResourceData) {
        match data {
            ResourceData::PendingOrders(orders) => self.pending_orders = orders.clone(),
            ResourceData::ActualOrder(order) => {
                self.order = order.clone();
                self.order_vanished = order.is_none();
                self.selection_needed = false;
            }
            ResourceData::HistoryOrder(history) => self.history = Some(history.clone()),
            other => debug!(kind = other.kind(), "Ignored by order view"),
        }
    }
}

/// Pending orders and the order-in-progress editor.
///
/// Bind, unbind and amount changes edit the cached order in place; nothing is
/// sent until [`OrderEditor::submit`].
pub struct OrderEditor {
    coordinator: Arc<MutationCoordinator>,
    view: Arc<Mutex<OrderView>>,
    subscriptions: Vec<(AdminEvent, SubscriptionId)>,
}

impl OrderEditor {
    const EVENTS: [AdminEvent; 2] = [
        AdminEvent::PendingOrdersUpdated,
        AdminEvent::ActualOrderSelected,
    ];

    pub fn new(coordinator: Arc<MutationCoordinator>) -> Arc<Self> {
        let view = Arc::new(Mutex::new(OrderView::default()));
        let subscriptions = Self::EVENTS
            .into_iter()
            .map(|event| {
                let view = Arc::clone(&view);
                let id = coordinator.bus().subscribe(event, move |payload| {
                    if let Some(data) = payload {
                        view.lock().render(data);
                    }
                });
                (event, id)
            })
            .collect();

        let editor = Arc::new(Self {
            coordinator,
            view,
            subscriptions,
        });
        editor.coordinator.register(&editor);
        editor
    }

    pub fn view(&self) -> OrderView {
        self.view.lock().clone()
    }

    pub async fn select_order(&self, order: OrderId) -> Result<(), CacheError> {
        self.coordinator.select_order(order).await
    }

    pub async fn show_history(&self, order: OrderId) -> Result<(), CacheError> {
        self.coordinator.select_history_order(order).await
    }

    #[instrument(skip(self))]
    pub async fn bind(&self, serial_number: &str) -> Result<(), CacheError> {
        let serial_number = serial_number.to_string();
        self.edit_order(move |order| order.bind(&serial_number)).await
    }

    #[instrument(skip(self))]
    pub async fn unbind(&self, serial_number: &str) -> Result<(), CacheError> {
        let serial_number = serial_number.to_string();
        self.edit_order(move |order| order.unbind(&serial_number)).await
    }

    #[instrument(skip(self))]
    pub async fn set_ordered(&self, type_name: &str, amount: u32) -> Result<(), CacheError> {
        let type_name = type_name.to_string();
        self.edit_order(move |order| order.set_ordered(&type_name, amount))
            .await
    }

    /// Sends the edited order. Local changes are replaced by the server's
    /// version on the following refresh.
    pub async fn submit(&self) -> Result<(), CacheError> {
        self.coordinator.submit_order_changes().await
    }

    pub async fn add_order(&self, order: &NewOrder) -> Result<(), CacheError> {
        self.coordinator.add_order(order).await
    }

    /// Hands the bound products over to the client and closes the order.
    pub async fn complete(&self) -> Result<(), CacheError> {
        self.coordinator.complete_order().await
    }

    pub async fn delete_order(&self, order: OrderId) -> Result<(), CacheError> {
        self.coordinator.delete_order(order).await
    }

    async fn edit_order(
        &self,
        edit: impl FnOnce(&mut OrderDescription) -> Result<(), OrderEditError> + Send + 'static,
    ) -> Result<(), CacheError> {
        let cache = self.coordinator.cache();
        cache
            .edit(ORDER_IN_PROGRESS, move |data| {
                let order = data.as_order_mut().ok_or_else(|| {
                    CacheError::Validation("the order no longer exists".to_string())
                })?;
                edit(order).map_err(|e| CacheError::Validation(e.to_string()))
            })
            .await?;

        if let Some(data) = cache.peek(ORDER_IN_PROGRESS).await? {
            self.view.lock().render(&data);
        }
        info!(resource = ORDER_IN_PROGRESS, "Edited locally");
        Ok(())
    }
}

#[async_trait]
impl Refreshable for OrderEditor {
    fn label(&self) -> &'static str {
        "order_editor"
    }

    #[instrument(skip(self), fields(consumer = "order_editor"))]
    async fn refresh(&self) -> Result<(), CacheError> {
        let cache = self.coordinator.cache();
        let context = self.coordinator.context();

        let pending = unless_unselected(
            self.label(),
            cache.ensure_fresh(PENDING_ORDERS, context.clone()).await,
        )?;
        let order = unless_unselected(
            self.label(),
            cache.ensure_fresh(ORDER_IN_PROGRESS, context.clone()).await,
        )?;
        let history = unless_unselected(
            self.label(),
            cache.ensure_fresh(HISTORY_ORDER, context).await,
        )?;

        let mut view = self.view.lock();
        match pending {
            Some(pending) => view.render(&pending),
            None => view.pending_orders.clear(),
        }
        match order {
            Some(order) => view.render(&order),
            None => {
                view.order = None;
                view.order_vanished = false;
                view.selection_needed = true;
            }
        }
        match history {
            Some(history) => view.render(&history),
            None => view.history = None,
        }
        Ok(())
    }
}

impl Drop for OrderEditor {
    fn drop(&mut self) {
        for (event, id) in self.subscriptions.drain(..) {
            self.coordinator.bus().unsubscribe(event, id);
        }
    }
}
