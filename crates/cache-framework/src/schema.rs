//! # CacheSchema Trait
//!
//! The `CacheSchema` trait ties together the three types an application plugs
//! into the cache: the context that parameterizes request targets, the closed
//! set of normalized values, and the names of the events announcing them.
//!
//! Like the entity trait of an actor system, it lets the loader, the client and
//! the bus be written once and reused for any domain.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Binds the application types used by every cache component.
///
/// # Example
///
/// ```rust
/// use cache_framework::CacheSchema;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Topic { CountUpdated, Invalidated }
///
/// impl std::fmt::Display for Topic {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{:?}", self)
///     }
/// }
///
/// struct Counter;
///
/// impl CacheSchema for Counter {
///     type Context = Option<u32>;
///     type Value = u64;
///     type Event = Topic;
///     const STATE_INVALIDATED: Topic = Topic::Invalidated;
/// }
/// ```
pub trait CacheSchema: Send + Sync + 'static {
    /// Currently selected identifiers that request targets are built from.
    type Context: Clone + Send + Sync + Debug + 'static;

    /// Normalized resource values, usually an enum with one variant per resource.
    type Value: Clone + Send + Sync + Debug + 'static;

    /// Event names announced on the bus.
    type Event: Copy + Eq + Hash + Send + Sync + Debug + Display + 'static;

    /// Payload-less signal telling every consumer to re-request its resources.
    const STATE_INVALIDATED: Self::Event;
}
