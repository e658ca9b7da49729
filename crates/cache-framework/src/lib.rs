//! # Cache Framework
//!
//! Building blocks for a reactive, invalidation-driven client-side cache of
//! server resources. Consumers never fetch directly: they ask the cache for a
//! named resource, the cache decides whether the network is needed, and fresh
//! data is announced on an event bus.
//!
//! ## Architecture Overview
//!
//! 1. **Schema Layer** ([`CacheSchema`], [`ResourceDescriptor`], [`ResourceRegistry`]) -
//!    the closed set of resources, how to address them and how to normalize them
//! 2. **Runtime Layer** ([`CacheActor`]) - owns cached data and staleness flags,
//!    serializes every operation and de-duplicates concurrent fetches
//! 3. **Interface Layer** ([`CacheClient`]) - cloneable async handle
//! 4. **Notification Layer** ([`EventBus`]) - synchronous publish/subscribe
//!
//! Writes do not go through the cache. A mutation layer posts to the server via
//! the same [`Transport`], invalidates the affected resources and publishes
//! `STATE_INVALIDATED`; consumers react by asking for their resources again.
//!
//! ## Staleness Model
//!
//! - Every resource starts stale.
//! - A successful fetch clears the flag unless the resource was invalidated
//!   while the fetch was running.
//! - Invalidation never drops cached data, it only forces the next access to
//!   go to the network.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let registry = Arc::new(build_registry()?);
//! let (actor, client) = CacheActor::new(registry, 32);
//! let bus = Arc::new(EventBus::new());
//! tokio::spawn(actor.run(transport, bus.clone()));
//!
//! let stats = client.ensure_fresh("storage_statistics", context).await?;
//! ```

mod actor;
pub mod bus;
mod client;
mod descriptor;
mod error;
pub mod indicator;
mod message;
pub mod mock;
mod registry;
mod schema;
mod staleness;
pub mod transport;

pub use actor::CacheActor;
pub use bus::{EventBus, Handler, SubscriptionId};
pub use client::CacheClient;
pub use descriptor::ResourceDescriptor;
pub use error::{CacheError, MissingContext};
pub use indicator::{ActivityIndicator, BusyGuard, NoopIndicator};
pub use message::{CacheRequest, Edit, Response};
pub use registry::{RegistryBuilder, ResourceRegistry};
pub use schema::CacheSchema;
pub use staleness::StalenessTracker;
pub use transport::{HttpTransport, Transport, TransportError};
