//! # Consumers
//!
//! Views over cached resources. A consumer:
//!
//! - subscribes to the events of the resources it shows when it is created
//! - re-renders its whole view from each payload it receives
//! - forwards user actions to the [`MutationCoordinator`](crate::coordinator::MutationCoordinator)
//! - re-requests its resources in [`Refreshable::refresh`](crate::coordinator::Refreshable::refresh)
//!   after every mutation
//!
//! The refresh wave is driven by the coordinator calling every registered
//! consumer's `refresh()` and awaiting it. Consumers do not subscribe to
//! `StateInvalidated`; that signal is published for listeners outside this
//! crate, such as an embedding UI.
//!
//! A missing selection during refresh is not an error for a consumer: the view
//! switches to a "selection needed" state instead.
//!
//! Consumers are created behind an `Arc`; dropping the last one unsubscribes
//! its handlers and takes it out of the refresh wave.

mod order_editor;
mod storage_manager;

pub use order_editor::{OrderEditor, OrderView};
pub use storage_manager::{StorageManager, StorageView};

use cache_framework::CacheError;
use tracing::debug;

/// Runs one fetch of a refresh, turning a missing selection into `None`.
pub(crate) fn unless_unselected<T>(
    consumer: &'static str,
    result: Result<T, CacheError>,
) -> Result<Option<T>, CacheError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CacheError::ContextIncomplete { resource, missing }) => {
            debug!(consumer, resource, missing, "Selection needed");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
