use serde::{Deserialize, Serialize};

/// One row of `/info_about_businesses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessEntry {
    pub name: String,
}

/// Details of the active business, from `/get_storage_info/id/{business}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: String,
    /// Whether the business runs a service department. Unset for new businesses.
    #[serde(default)]
    pub is_service: Option<bool>,
}

impl BusinessInfo {
    pub fn is_service(&self) -> bool {
        self.is_service.unwrap_or(false)
    }
}
