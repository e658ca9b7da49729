use super::product::FormError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Form for opening a new order between two businesses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewOrder {
    pub client: String,
    pub supplier: String,
    /// Free-form date; the server stores `null` when absent.
    pub date: Option<String>,
    /// Ordered amount per type. Zero amounts are not sent.
    pub types: BTreeMap<String, u32>,
}

impl NewOrder {
    pub fn new(client: impl Into<String>, supplier: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            supplier: supplier.into(),
            ..Self::default()
        }
    }

    pub fn dated(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>, amount: u32) -> Self {
        self.types.insert(type_name.into(), amount);
        self
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.client.trim().is_empty() {
            return Err(FormError::Missing("client"));
        }
        if self.supplier.trim().is_empty() {
            return Err(FormError::Missing("supplier"));
        }
        if self.types.keys().any(|name| name.trim().is_empty()) {
            return Err(FormError::Missing("type"));
        }
        if !self.types.values().any(|&amount| amount > 0) {
            return Err(FormError::Missing("ordered amount"));
        }
        Ok(())
    }

    /// `/add_order` body: the two sides and the date, plus one
    /// `{"type", "number"}` entry per ordered type under any other key.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("client_name".into(), json!(self.client.trim()));
        body.insert("supplier_name".into(), json!(self.supplier.trim()));
        body.insert("order_date".into(), json!(self.date));
        let ordered = self.types.iter().filter(|(_, amount)| **amount > 0);
        for (index, (type_name, amount)) in ordered.enumerate() {
            body.insert(
                format!("type_{}", index + 1),
                json!({ "type": type_name.trim(), "number": amount }),
            );
        }
        Value::Object(body)
    }
}
