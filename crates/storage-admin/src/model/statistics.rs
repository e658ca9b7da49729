use super::wire;
use serde::{Deserialize, Serialize};

/// Per-type storage counters, one row of `/get_statistics/id/{business}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRow {
    // Older servers label the column with a Latin "T".
    #[serde(rename = "Тип", alias = "Tип")]
    pub type_name: String,

    #[serde(rename = "К-во", deserialize_with = "wire::count", default)]
    pub count: u32,

    #[serde(rename = "К-во исправных", deserialize_with = "wire::count", default)]
    pub valid: u32,

    #[serde(rename = "Заказано", deserialize_with = "wire::count", default)]
    pub ordered: u32,

    #[serde(
        rename = "Критический уровень",
        deserialize_with = "wire::optional_count",
        default
    )]
    pub critical_level: Option<u32>,
}

impl StatisticsRow {
    /// Serviceable items left once pending orders are served.
    pub fn spare(&self) -> i64 {
        i64::from(self.valid) - i64::from(self.ordered)
    }

    /// True when the spare stock fell to or below the critical level.
    pub fn is_critical(&self) -> bool {
        self.critical_level
            .is_some_and(|level| self.spare() <= i64::from(level))
    }
}

/// Product types present on the storage, in row order.
pub fn existing_types(rows: &[StatisticsRow]) -> Vec<String> {
    rows.iter().map(|row| row.type_name.clone()).collect()
}
