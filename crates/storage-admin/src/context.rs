//! The session's current selection.

use crate::model::OrderId;
use serde::{Deserialize, Serialize};

/// Selected identifiers that request targets are built from.
///
/// Only the mutation coordinator changes it; everyone else reads snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub business: Option<String>,
    pub order: Option<OrderId>,
    pub history_order: Option<OrderId>,
}

impl SessionContext {
    pub fn with_business(business: impl Into<String>) -> Self {
        Self {
            business: Some(business.into()),
            ..Self::default()
        }
    }

    pub fn business(&self) -> Option<&str> {
        self.business.as_deref()
    }

    /// Selects another business. Order selections belong to the previous one
    /// and are cleared.
    pub fn switch_business(&mut self, business: impl Into<String>) {
        self.business = Some(business.into());
        self.order = None;
        self.history_order = None;
    }
}
