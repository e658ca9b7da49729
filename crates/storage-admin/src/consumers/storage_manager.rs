use super::unless_unselected;
use crate::coordinator::{MutationCoordinator, Refreshable, SwitchOutcome};
use crate::model::catalog::{MODEL_COLUMN, PRODUCER_COLUMN};
use crate::model::statistics::existing_types;
use crate::model::{BusinessInfo, NewProduct, StatisticsRow};
use crate::resources::names::*;
use crate::resources::{AdminEvent, ResourceData};
use async_trait::async_trait;
use cache_framework::{CacheError, SubscriptionId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What the storage screen shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageView {
    pub businesses: Vec<String>,
    pub active_business: Option<BusinessInfo>,
    pub statistics: Vec<StatisticsRow>,
    /// Product types present in the statistics, for the "add product" form.
    pub existing_types: Vec<String>,
    /// Known producers and models, suggested by the same form.
    pub producers: Vec<String>,
    pub models: Vec<String>,
    /// No business is selected yet.
    pub selection_needed: bool,
}

impl StorageView {
    fn render(&mut self, data: &ResourceData) {
        match data {
            ResourceData::BusinessList(names) => self.businesses = names.clone(),
            ResourceData::ActiveBusiness(info) => {
                self.active_business = Some(info.clone());
                self.selection_needed = false;
            }
            ResourceData::StorageStatistics(rows) => {
                self.existing_types = existing_types(rows);
                self.statistics = rows.clone();
                self.selection_needed = false;
            }
            ResourceData::Catalog(catalog) => {
                self.producers = catalog.producer_names(PRODUCER_COLUMN);
                self.models = catalog.model_names(MODEL_COLUMN);
            }
            other => debug!(kind = other.kind(), "Ignored by storage view"),
        }
    }

    fn clear_selection(&mut self) {
        self.active_business = None;
        self.statistics.clear();
        self.existing_types.clear();
        self.selection_needed = true;
    }
}

/// Business list, storage statistics, the product catalog and the
/// business-level actions.
pub struct StorageManager {
    coordinator: Arc<MutationCoordinator>,
    view: Arc<Mutex<StorageView>>,
    subscriptions: Vec<(AdminEvent, SubscriptionId)>,
}

impl StorageManager {
    const EVENTS: [AdminEvent; 4] = [
        AdminEvent::BusinessListUpdated,
        AdminEvent::BusinessChanged,
        AdminEvent::StatisticsUpdated,
        AdminEvent::CatalogUpdated,
    ];

    pub fn new(coordinator: Arc<MutationCoordinator>) -> Arc<Self> {
        let view = Arc::new(Mutex::new(StorageView::default()));
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

        let manager = Arc::new(Self {
            coordinator,
            view,
            subscriptions,
        });
        manager.coordinator.register(&manager);
        manager
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> StorageView {
        self.view.lock().clone()
    }

    pub async fn switch_business(&self, name: &str) -> Result<SwitchOutcome, CacheError> {
        self.coordinator.switch_business(name).await
    }

    pub async fn add_business(&self, name: &str) -> Result<(), CacheError> {
        self.coordinator.create_business(name).await
    }

    /// The caller clears its form only once this returns `Ok`.
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), CacheError> {
        self.coordinator.add_product(product).await
    }

    pub async fn set_critical_level(&self, type_name: &str, amount: u32) -> Result<(), CacheError> {
        self.coordinator.set_critical_level(type_name, amount).await
    }

    pub async fn update_business_status(&self, is_service: bool) -> Result<(), CacheError> {
        self.coordinator.update_business_status(is_service).await
    }

    pub async fn delete_business(&self, name: &str) -> Result<(), CacheError> {
        self.coordinator.delete_business(name).await
    }

    pub async fn delete_product(&self, serial_number: &str) -> Result<(), CacheError> {
        self.coordinator.delete_product(serial_number).await
    }

    pub async fn change_products_state(
        &self,
        unbind: &[String],
        change_condition: &[String],
    ) -> Result<(), CacheError> {
        self.coordinator
            .change_products_state(unbind, change_condition)
            .await
    }
}

#[async_trait]
impl Refreshable for StorageManager {
    fn label(&self) -> &'static str {
        "storage_manager"
    }

    #[instrument(skip(self), fields(consumer = "storage_manager"))]
    async fn refresh(&self) -> Result<(), CacheError> {
        let cache = self.coordinator.cache();
        let context = self.coordinator.context();

        let businesses = cache.ensure_fresh(BUSINESS_LIST, context.clone()).await?;
        self.view.lock().render(&businesses);
        let catalog = cache.ensure_fresh(PRODUCERS_AND_MODELS, context.clone()).await?;
        self.view.lock().render(&catalog);

        let active = unless_unselected(
            self.label(),
            cache.ensure_fresh(ACTIVE_BUSINESS, context.clone()).await,
        )?;
        let statistics = unless_unselected(
            self.label(),
            cache.ensure_fresh(STORAGE_STATISTICS, context).await,
        )?;

        {
            let mut view = self.view.lock();
            match (active, statistics) {
                (Some(active), Some(statistics)) => {
                    view.render(&active);
                    view.render(&statistics);
                }
                _ => view.clear_selection(),
            }
        }
        Ok(())
    }
}

impl Drop for StorageManager {
    fn drop(&mut self) {
        for (event, id) in self.subscriptions.drain(..) {
            self.coordinator.bus().unsubscribe(event, id);
        }
    }
}
