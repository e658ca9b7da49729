//! # Activity Indicator
//!
//! A global "busy" signal shown while a mutation and its refresh wave run.
//! [`BusyGuard`] raises it on creation and lowers it when dropped, so the
//! signal is cleared on every exit path, errors and early returns included.

use std::sync::Arc;
use tracing::trace;

/// Receives busy/idle transitions.
pub trait ActivityIndicator: Send + Sync {
    fn set_busy(&self, busy: bool);
}

/// Indicator that displays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl ActivityIndicator for NoopIndicator {
    fn set_busy(&self, _busy: bool) {}
}

/// Scoped busy signal.
#[must_use = "the indicator is cleared as soon as the guard is dropped"]
pub struct BusyGuard {
    indicator: Arc<dyn ActivityIndicator>,
}

impl BusyGuard {
    pub fn raise(indicator: Arc<dyn ActivityIndicator>) -> Self {
        trace!("Busy");
        indicator.set_busy(true);
        Self { indicator }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        trace!("Idle");
        self.indicator.set_busy(false);
    }
}
