//! # Mutation Coordinator
//!
//! Every write of the admin panel goes through [`MutationCoordinator`]. Each
//! operation follows the same shape:
//!
//! 1. **Validate** locally. Invalid input fails with `Validation`, nothing is sent.
//! 2. **Submit** the change to the server.
//! 3. **On success**: commit the new selection, invalidate exactly the
//!    resources the change affects, publish `StateInvalidated` and await the
//!    refresh of every registered consumer.
//! 4. **On failure**: return the error; selection and cache stay untouched.
//!
//! The busy indicator is raised for the whole operation, refresh wave included.
//!
//! | operation | request | invalidates |
//! |-----------|---------|-------------|
//! | `switch_business` (known) | none | all but `business_list` |
//! | `create_business` | `POST /add_new_business` | all |
//! | `add_product` | `POST /add_items_on_storage/id/{business}` | `storage_statistics` |
//! | `set_critical_level` | `POST /modify_critical_level` | `storage_statistics` |
//! | `update_business_status` | `POST /update_business_status` | `active_business` |
//! | `select_order` | none | `order_in_progress` |
//! | `select_history_order` | none | `history_order` |
//! | `submit_order_changes` | `POST /edit_order/id/{order}` | order, statistics, pending orders |
//! | `add_order` | `POST /add_order` | pending orders, statistics |
//! | `complete_order` | `POST /complete_order/id/{order}` | order, history order, statistics, pending orders |
//! | `delete_order` | `DELETE /delete_order/id/{order}` | order, statistics, pending orders |
//! | `change_products_state` | `POST /change_products_state` | statistics, order |
//! | `delete_product` | `DELETE /delete_product` | statistics, order |
//! | `delete_business` | `DELETE /delete_business` | all |

use crate::context::SessionContext;
use crate::model::{NewOrder, NewProduct, OrderId};
use crate::resources::names::*;
use crate::resources::{AdminBus, AdminClient, AdminSchema, ResourceData};
use async_trait::async_trait;
use cache_framework::{ActivityIndicator, BusyGuard, CacheError, CacheSchema, Transport};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// A consumer that re-requests its resources after a mutation.
#[async_trait]
pub trait Refreshable: Send + Sync {
    /// Label for logs.
    fn label(&self) -> &'static str;

    async fn refresh(&self) -> Result<(), CacheError>;
}

/// What `switch_business` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The business was already known; no request was sent.
    Switched,
    /// The business was unknown and has been created.
    Created,
}

/// Orchestrates remote mutations, selection changes and invalidation.
pub struct MutationCoordinator {
    context: watch::Sender<SessionContext>,
    transport: Arc<dyn Transport>,
    cache: AdminClient,
    bus: Arc<AdminBus>,
    indicator: Arc<dyn ActivityIndicator>,
    consumers: Mutex<Vec<Weak<dyn Refreshable>>>,
}

impl MutationCoordinator {
    pub fn new(
        context: SessionContext,
        transport: Arc<dyn Transport>,
        cache: AdminClient,
        bus: Arc<AdminBus>,
        indicator: Arc<dyn ActivityIndicator>,
    ) -> Self {
        let (context, _) = watch::channel(context);
        Self {
            context,
            transport,
            cache,
            bus,
            indicator,
            consumers: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current selection.
    pub fn context(&self) -> SessionContext {
        self.context.borrow().clone()
    }

    /// Follows selection changes.
    pub fn watch_context(&self) -> watch::Receiver<SessionContext> {
        self.context.subscribe()
    }

    pub fn bus(&self) -> &Arc<AdminBus> {
        &self.bus
    }

    pub fn cache(&self) -> &AdminClient {
        &self.cache
    }

    /// Adds a consumer to the refresh wave. Dropped consumers leave it on their own.
    pub fn register<C: Refreshable + 'static>(&self, consumer: &Arc<C>) {
        let consumer: Arc<dyn Refreshable> = consumer.clone();
        debug!(consumer = consumer.label(), "Registered for refresh");
        self.consumers.lock().push(Arc::downgrade(&consumer));
    }

    /// Re-requests every registered consumer's resources.
    ///
    /// All consumers are refreshed even if one fails; the first error is returned.
    pub async fn refresh_all(&self) -> Result<(), CacheError> {
        let consumers: Vec<Arc<dyn Refreshable>> = {
            let mut consumers = self.consumers.lock();
            consumers.retain(|consumer| consumer.strong_count() > 0);
            consumers.iter().filter_map(Weak::upgrade).collect()
        };
        debug!(consumers = consumers.len(), "Refresh wave");

        let results = futures::future::join_all(consumers.iter().map(|c| c.refresh())).await;
        let mut first_error = None;
        for (consumer, result) in consumers.iter().zip(results) {
            if let Err(e) = result {
                warn!(consumer = consumer.label(), error = %e, "Refresh failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Makes `candidate` the active business, creating it if it is unknown.
    ///
    /// Known businesses are checked against the cached business list, stale or
    /// not. The list is only (re)loaded when it was never loaded, or when it is
    /// stale and does not name `candidate`. Switching to a business the cached
    /// list names sends nothing.
    #[instrument(skip(self))]
    pub async fn switch_business(&self, candidate: &str) -> Result<SwitchOutcome, CacheError> {
        let name = business_name(candidate)?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        let known = match self.cache.peek(BUSINESS_LIST).await? {
            Some(list) if names_business(&list, name) => true,
            cached => {
                // A stale list may predate the business.
                if cached.is_some() && self.cache.is_actual(BUSINESS_LIST).await? {
                    false
                } else {
                    let list = self.cache.ensure_fresh(BUSINESS_LIST, self.context()).await?;
                    names_business(&list, name)
                }
            }
        };

        if !known {
            info!(business = name, "Unknown business, creating it");
            self.create(name).await?;
            return Ok(SwitchOutcome::Created);
        }

        self.context.send_modify(|context| context.switch_business(name));
        self.cache.mark_all_stale_except(&[BUSINESS_LIST]).await?;
        info!(business = name, "Switched business");
        self.broadcast().await?;
        Ok(SwitchOutcome::Switched)
    }

    #[instrument(skip(self))]
    pub async fn select_order(&self, order: OrderId) -> Result<(), CacheError> {
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));
        self.context.send_modify(|context| context.order = Some(order));
        self.cache.mark_stale(ORDER_IN_PROGRESS).await?;
        self.broadcast().await
    }

    #[instrument(skip(self))]
    pub async fn select_history_order(&self, order: OrderId) -> Result<(), CacheError> {
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));
        self.context
            .send_modify(|context| context.history_order = Some(order));
        self.cache.mark_stale(HISTORY_ORDER).await?;
        self.broadcast().await
    }

    // =========================================================================
    // Remote mutations
    // =========================================================================

    /// Registers a new business and makes it active.
    #[instrument(skip(self))]
    pub async fn create_business(&self, name: &str) -> Result<(), CacheError> {
        let name = business_name(name)?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));
        self.create(name).await
    }

    async fn create(&self, name: &str) -> Result<(), CacheError> {
        self.submit("/add_new_business", json!({ "name": name }))
            .await?;
        self.context.send_modify(|context| context.switch_business(name));
        self.cache.mark_all_stale().await?;
        info!(business = name, "Business created");
        self.broadcast().await
    }

    /// Adds a product to the active business's storage.
    #[instrument(skip(self, product), fields(serial = %product.serial_number))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), CacheError> {
        product
            .validate()
            .map_err(|e| CacheError::Validation(e.to_string()))?;
        let business = self.require_business(STORAGE_STATISTICS)?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        let target = format!("/add_items_on_storage/id/{}", urlencoding::encode(&business));
        let body = serde_json::to_value(product)
            .map_err(|e| CacheError::Validation(format!("cannot encode product: {e}")))?;
        self.submit(&target, body).await?;
        self.cache.mark_stale(STORAGE_STATISTICS).await?;
        self.broadcast().await
    }

    /// Changes the critical stock level of a product type.
    #[instrument(skip(self))]
    pub async fn set_critical_level(&self, type_name: &str, amount: u32) -> Result<(), CacheError> {
        let type_name = type_name.trim();
        if type_name.is_empty() {
            return Err(CacheError::Validation("type is required".to_string()));
        }
        let business = self.require_business(STORAGE_STATISTICS)?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.submit(
            "/modify_critical_level",
            json!({ "owner": business, "type_name": type_name, "amount": amount }),
        )
        .await?;
        self.cache.mark_stale(STORAGE_STATISTICS).await?;
        self.broadcast().await
    }

    /// Marks the active business as running (or not) a service department.
    #[instrument(skip(self))]
    pub async fn update_business_status(&self, is_service: bool) -> Result<(), CacheError> {
        let business = self.require_business(ACTIVE_BUSINESS)?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.submit(
            "/update_business_status",
            json!({ "name": business, "is_service": is_service }),
        )
        .await?;
        self.cache.mark_stale(ACTIVE_BUSINESS).await?;
        self.broadcast().await
    }

    /// Sends the locally edited order-in-progress to the server.
    #[instrument(skip(self))]
    pub async fn submit_order_changes(&self) -> Result<(), CacheError> {
        let order = self
            .context()
            .order
            .ok_or(CacheError::ContextIncomplete {
                resource: ORDER_IN_PROGRESS,
                missing: "order",
            })?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        let package = self.cache.pack(ORDER_IN_PROGRESS).await?;
        self.submit(&format!("/edit_order/id/{order}"), package)
            .await?;
        self.invalidate(&[ORDER_IN_PROGRESS, STORAGE_STATISTICS, PENDING_ORDERS])
            .await?;
        self.broadcast().await
    }

    /// Opens a new order. It shows up in the supplier's pending orders.
    #[instrument(skip(self, order), fields(client = %order.client, supplier = %order.supplier))]
    pub async fn add_order(&self, order: &NewOrder) -> Result<(), CacheError> {
        order
            .validate()
            .map_err(|e| CacheError::Validation(e.to_string()))?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.submit("/add_order", order.body()).await?;
        self.invalidate(&[PENDING_ORDERS, STORAGE_STATISTICS]).await?;
        self.broadcast().await
    }

    /// Completes the selected order with the products currently bound to it,
    /// unsubmitted edits included. Ownership of those products moves to the
    /// order's client and the selection is cleared.
    #[instrument(skip(self))]
    pub async fn complete_order(&self) -> Result<(), CacheError> {
        let order = self
            .context()
            .order
            .ok_or(CacheError::ContextIncomplete {
                resource: ORDER_IN_PROGRESS,
                missing: "order",
            })?;
        let cached = self
            .cache
            .peek(ORDER_IN_PROGRESS)
            .await?
            .ok_or_else(|| CacheError::NotLoaded(ORDER_IN_PROGRESS.to_string()))?;
        let description = cached
            .as_order()
            .ok_or_else(|| CacheError::Validation(format!("order {order} no longer exists")))?;
        let customer = description
            .sides
            .client
            .clone()
            .ok_or_else(|| CacheError::Validation(format!("order {order} has no client")))?;
        if description.bound.is_empty() {
            return Err(CacheError::Validation(format!(
                "no products are bound to order {order}"
            )));
        }
        let products: Vec<&String> = description.bound.iter().collect();
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.submit(
            &format!("/complete_order/id/{order}"),
            json!({ "products": products, "customer": customer }),
        )
        .await?;
        self.context.send_if_modified(|context| {
            let selected = context.order == Some(order);
            if selected {
                context.order = None;
            }
            selected
        });
        self.invalidate(&[
            ORDER_IN_PROGRESS,
            HISTORY_ORDER,
            STORAGE_STATISTICS,
            PENDING_ORDERS,
        ])
        .await?;
        info!(order, products = products.len(), "Order completed");
        self.broadcast().await
    }

    /// Deletes an order and releases its bound products.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order: OrderId) -> Result<(), CacheError> {
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.remove(&format!("/delete_order/id/{order}"), json!({}))
            .await?;
        self.context.send_if_modified(|context| {
            let selected = context.order == Some(order);
            if selected {
                context.order = None;
            }
            selected
        });
        self.invalidate(&[ORDER_IN_PROGRESS, STORAGE_STATISTICS, PENDING_ORDERS])
            .await?;
        self.broadcast().await
    }

    /// Detaches products from their orders and toggles the serviceable flag
    /// of others. Either list may be empty, not both.
    #[instrument(skip(self))]
    pub async fn change_products_state(
        &self,
        unbind: &[String],
        change_condition: &[String],
    ) -> Result<(), CacheError> {
        if unbind.is_empty() && change_condition.is_empty() {
            return Err(CacheError::Validation("no products selected".to_string()));
        }
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.submit(
            "/change_products_state",
            json!({ "unbind": unbind, "change_condition": change_condition }),
        )
        .await?;
        self.invalidate(&[STORAGE_STATISTICS, ORDER_IN_PROGRESS]).await?;
        self.broadcast().await
    }

    /// Removes a product from whichever storage holds it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, serial_number: &str) -> Result<(), CacheError> {
        let serial_number = serial_number.trim();
        if serial_number.is_empty() {
            return Err(CacheError::Validation("serial number is required".to_string()));
        }
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.remove("/delete_product", json!({ "serial_number": serial_number }))
            .await?;
        self.invalidate(&[STORAGE_STATISTICS, ORDER_IN_PROGRESS]).await?;
        self.broadcast().await
    }

    /// Deletes a business. Deleting the active one leaves nothing selected.
    #[instrument(skip(self))]
    pub async fn delete_business(&self, name: &str) -> Result<(), CacheError> {
        let name = business_name(name)?;
        let _busy = BusyGuard::raise(Arc::clone(&self.indicator));

        self.remove("/delete_business", json!({ "id": name })).await?;
        self.context.send_if_modified(|context| {
            let active = context.business() == Some(name);
            if active {
                *context = SessionContext::default();
            }
            active
        });
        self.cache.mark_all_stale().await?;
        info!(business = name, "Business deleted");
        self.broadcast().await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_business(&self, resource: &'static str) -> Result<String, CacheError> {
        self.context()
            .business
            .ok_or(CacheError::ContextIncomplete {
                resource,
                missing: "business",
            })
    }

    async fn invalidate(&self, names: &[&str]) -> Result<(), CacheError> {
        for name in names {
            self.cache.mark_stale(name).await?;
        }
        Ok(())
    }

    async fn submit(&self, target: &str, body: Value) -> Result<Value, CacheError> {
        debug!(endpoint = target, %body, "Submit");
        let response = self
            .transport
            .post(target, body)
            .await
            .map_err(|e| e.into_cache_error(target))?;
        info!(endpoint = target, "Accepted");
        Ok(response)
    }

    async fn remove(&self, target: &str, body: Value) -> Result<Value, CacheError> {
        debug!(endpoint = target, %body, "Delete");
        let response = self
            .transport
            .delete(target, body)
            .await
            .map_err(|e| e.into_cache_error(target))?;
        info!(endpoint = target, "Deleted");
        Ok(response)
    }

    /// Publishes the global signal, then waits for the refresh wave.
    async fn broadcast(&self) -> Result<(), CacheError> {
        self.bus.publish(AdminSchema::STATE_INVALIDATED, None);
        self.refresh_all().await
    }
}

fn names_business(list: &ResourceData, name: &str) -> bool {
    list.as_business_list()
        .is_some_and(|names| names.iter().any(|n| n == name))
}

fn business_name(candidate: &str) -> Result<&str, CacheError> {
    let name = candidate.trim();
    if name.is_empty() {
        return Err(CacheError::Validation("business name is required".to_string()));
    }
    Ok(name)
}
