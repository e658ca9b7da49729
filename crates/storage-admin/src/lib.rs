//! # Storage Admin
//!
//! Client side of the storage admin panel: businesses, their storage
//! statistics and the orders between them, served from a reactive cache.
//!
//! ## Module Tour
//!
//! - **[`model`]**: wire models of the server's responses and form bodies.
//! - **[`resources`]**: the resource table, its events and [`AdminSchema`](resources::AdminSchema).
//! - **[`context`]**: the current selection that request targets are built from.
//! - **[`coordinator`]**: every mutation, followed by targeted invalidation and
//!   a refresh wave.
//! - **[`consumers`]**: the storage and order screens as views over the cache.
//! - **[`lifecycle`]**: startup, wiring, tracing and shutdown.
//! - **[`config`]**: defaults and environment overrides.
//!
//! ## Flow
//!
//! A screen calls a coordinator operation. The coordinator submits it, commits
//! the new selection, marks the affected resources stale and publishes
//! `StateInvalidated`. It then has every registered screen re-request its
//! resources; stale ones are refetched and announce themselves on the bus,
//! the rest come from the cache without a request.

pub mod config;
pub mod consumers;
pub mod context;
pub mod coordinator;
pub mod lifecycle;
pub mod model;
pub mod resources;

pub use config::AdminConfig;
pub use context::SessionContext;
pub use coordinator::{MutationCoordinator, Refreshable, SwitchOutcome};
pub use lifecycle::{AdminSystem, SystemError};
