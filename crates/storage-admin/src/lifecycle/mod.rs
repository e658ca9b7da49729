//! System startup, wiring and shutdown.

pub mod tracing;

use crate::config::{AdminConfig, ConfigError};
use crate::consumers::{OrderEditor, StorageManager};
use crate::context::SessionContext;
use crate::coordinator::MutationCoordinator;
use crate::resources::{build_registry, AdminBus, AdminClient, AdminSchema};
use ::tracing::{error, info};
use cache_framework::{
    ActivityIndicator, CacheActor, CacheError, EventBus, HttpTransport, NoopIndicator, Transport,
    TransportError,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot create HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid resource table: {0}")]
    Registry(#[from] CacheError),
}

/// The running admin panel: the cache actor, its event bus and the coordinator.
///
/// # Example
///
/// ```ignore
/// let system = AdminSystem::new(&AdminConfig::from_env()?)?;
/// let storage = system.storage_manager();
///
/// storage.switch_business("Acme").await?;
/// println!("{:?}", storage.view().statistics);
///
/// drop(storage);
/// system.shutdown().await?;
/// ```
pub struct AdminSystem {
    pub cache: AdminClient,
    pub bus: Arc<AdminBus>,
    pub coordinator: Arc<MutationCoordinator>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl AdminSystem {
    /// Starts the panel against the configured HTTP server.
    pub fn new(config: &AdminConfig) -> Result<Self, SystemError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.base_url, config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport), Arc::new(NoopIndicator))
    }

    /// Starts the panel on any transport and busy indicator.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_transport(
        config: &AdminConfig,
        transport: Arc<dyn Transport>,
        indicator: Arc<dyn ActivityIndicator>,
    ) -> Result<Self, SystemError> {
        let registry = Arc::new(build_registry()?);
        let bus = Arc::new(EventBus::new());

        let (actor, cache) = CacheActor::<AdminSchema>::new(registry, config.channel_capacity);
        let handle = tokio::spawn(actor.run(Arc::clone(&transport), Arc::clone(&bus)));

        let context = config
            .initial_business
            .as_deref()
            .map(SessionContext::with_business)
            .unwrap_or_default();
        let coordinator = Arc::new(MutationCoordinator::new(
            context,
            transport,
            cache.clone(),
            Arc::clone(&bus),
            indicator,
        ));

        info!(base_url = %config.base_url, "Admin system started");
        Ok(Self {
            cache,
            bus,
            coordinator,
            handles: vec![handle],
        })
    }

    /// Creates a storage screen registered for the refresh wave.
    pub fn storage_manager(&self) -> Arc<StorageManager> {
        StorageManager::new(Arc::clone(&self.coordinator))
    }

    /// Creates an order screen registered for the refresh wave.
    pub fn order_editor(&self) -> Arc<OrderEditor> {
        OrderEditor::new(Arc::clone(&self.coordinator))
    }

    /// Stops the cache actor and waits for it.
    ///
    /// Consumers hold the coordinator and with it a cache client; drop them
    /// first or the actor keeps running.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down admin system...");
        drop(self.coordinator);
        drop(self.cache);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Cache task failed: {:?}", e);
                return Err(format!("Cache task failed: {:?}", e));
            }
        }

        info!("Admin system shutdown complete.");
        Ok(())
    }
}
