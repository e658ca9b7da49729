use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A catalog row as the server sends it.
pub type Record = BTreeMap<String, Value>;

/// Columns named like the product fields they were stored from.
pub const MODEL_COLUMN: &str = "model";
pub const PRODUCER_COLUMN: &str = "producent";

/// Known producers and models, from `/get_producents_and_models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducersAndModels {
    #[serde(default)]
    pub models: Vec<Record>,
    #[serde(rename = "producents", default)]
    pub producers: Vec<Record>,
}

impl ProducersAndModels {
    /// Distinct string values of `column` across the producer rows.
    pub fn producer_names(&self, column: &str) -> Vec<String> {
        distinct(&self.producers, column)
    }

    /// Distinct string values of `column` across the model rows.
    pub fn model_names(&self, column: &str) -> Vec<String> {
        distinct(&self.models, column)
    }
}

fn distinct(records: &[Record], column: &str) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .filter_map(|record| record.get(column)?.as_str().map(str::to_string))
        .collect();
    names.sort();
    names.dedup();
    names
}
