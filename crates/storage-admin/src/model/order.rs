//! Orders: the pending-order listing, the editable order-in-progress and
//! completed (history) orders.

use super::wire;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

pub type OrderId = u32;

/// One row of `/get_orders/{business}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    #[serde(rename = "Ид заказа")]
    pub id: OrderId,
    #[serde(rename = "Дата заказа", default)]
    pub date: Option<String>,
    #[serde(rename = "Клиент")]
    pub client: String,
    #[serde(rename = "Поставщик")]
    pub supplier: String,
}

/// The two businesses taking part in an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSides {
    #[serde(rename = "Поставщик", alias = "Supplier", default)]
    pub supplier: Option<String>,
    #[serde(rename = "Клиент", alias = "Client", default)]
    pub client: Option<String>,
}

/// A serviceable product of the supplier that can serve the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableProduct {
    #[serde(rename = "Тип", alias = "Type")]
    pub type_name: String,
    #[serde(rename = "Производитель", alias = "Producer", default)]
    pub producer: Option<String>,
    #[serde(rename = "Модель", alias = "Model", default)]
    pub model: Option<String>,
    #[serde(rename = "Серийный номер", alias = "Serial number")]
    pub serial_number: String,
    /// Order the product is already attached to, if any.
    #[serde(rename = "Привязан к заказу", alias = "Bound to order", default)]
    pub bound_to: Option<OrderId>,
    #[serde(rename = "Дополнительная информация", alias = "Additional info", default)]
    pub additional_info: Option<String>,
}

/// Per-type figures of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStat {
    #[serde(rename = "Тип", alias = "Type")]
    pub type_name: String,
    #[serde(rename = "Заказано", alias = "Ordered", deserialize_with = "wire::count", default)]
    pub ordered: u32,
    #[serde(rename = "К-во исправных свободных", deserialize_with = "wire::count", default)]
    pub free: u32,
    #[serde(rename = "К-во на складе", deserialize_with = "wire::count", default)]
    pub in_stock: u32,
    #[serde(rename = "К-во привязаных", deserialize_with = "wire::count", default)]
    pub bound: u32,
}

/// `/expand_order/id/{order}` as sent by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrderDescription {
    #[serde(default)]
    pub order_sides: OrderSides,
    /// Keyed by type name.
    #[serde(default)]
    pub order_stats: BTreeMap<String, OrderStat>,
    #[serde(default)]
    pub available_products: Vec<AvailableProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderEditError {
    #[error("product {0} is not available for this order")]
    UnknownProduct(String),

    #[error("type name is required")]
    MissingType,
}

/// The order being edited.
///
/// `bound` and `unbound` partition the available products by serial number.
/// They are the only part of the cache that may change without a refetch;
/// [`OrderDescription::pack`] turns them into the `/edit_order` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDescription {
    pub sides: OrderSides,
    pub stats: Vec<OrderStat>,
    /// Ordered amount per type.
    pub order_types: BTreeMap<String, u32>,
    /// Keyed by serial number.
    pub available_products: BTreeMap<String, AvailableProduct>,
    pub bound: BTreeSet<String>,
    pub unbound: BTreeSet<String>,
}

/// Submission body of `/edit_order/id/{order}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPackage {
    pub order_types: BTreeMap<String, u32>,
    pub binded_products: Vec<String>,
    pub unbinded_products: Vec<String>,
}

impl From<RawOrderDescription> for OrderDescription {
    fn from(raw: RawOrderDescription) -> Self {
        let order_types = raw
            .order_stats
            .values()
            .map(|stat| (stat.type_name.clone(), stat.ordered))
            .collect();
        let (bound, unbound): (Vec<&AvailableProduct>, Vec<&AvailableProduct>) = raw
            .available_products
            .iter()
            .partition(|product| product.bound_to.is_some());
        let bound = bound.into_iter().map(|p| p.serial_number.clone()).collect();
        let unbound = unbound.into_iter().map(|p| p.serial_number.clone()).collect();
        let available_products = raw
            .available_products
            .into_iter()
            .map(|product| (product.serial_number.clone(), product))
            .collect();

        Self {
            sides: raw.order_sides,
            stats: raw.order_stats.into_values().collect(),
            order_types,
            available_products,
            bound,
            unbound,
        }
    }
}

impl OrderDescription {
    /// Attaches a product to the order.
    pub fn bind(&mut self, serial_number: &str) -> Result<(), OrderEditError> {
        self.check_available(serial_number)?;
        self.unbound.remove(serial_number);
        self.bound.insert(serial_number.to_string());
        Ok(())
    }

    /// Detaches a product from the order.
    pub fn unbind(&mut self, serial_number: &str) -> Result<(), OrderEditError> {
        self.check_available(serial_number)?;
        self.bound.remove(serial_number);
        self.unbound.insert(serial_number.to_string());
        Ok(())
    }

    /// Changes the ordered amount of a type. Zero drops the type from the order.
    pub fn set_ordered(&mut self, type_name: &str, amount: u32) -> Result<(), OrderEditError> {
        let type_name = type_name.trim();
        if type_name.is_empty() {
            return Err(OrderEditError::MissingType);
        }
        if amount == 0 {
            self.order_types.remove(type_name);
        } else {
            self.order_types.insert(type_name.to_string(), amount);
        }
        Ok(())
    }

    /// Bound products of one type.
    pub fn bound_of_type(&self, type_name: &str) -> usize {
        self.bound
            .iter()
            .filter_map(|serial| self.available_products.get(serial))
            .filter(|product| product.type_name == type_name)
            .count()
    }

    pub fn pack(&self) -> OrderPackage {
        OrderPackage {
            order_types: self.order_types.clone(),
            binded_products: self.bound.iter().cloned().collect(),
            unbinded_products: self.unbound.iter().cloned().collect(),
        }
    }

    fn check_available(&self, serial_number: &str) -> Result<(), OrderEditError> {
        if self.available_products.contains_key(serial_number) {
            Ok(())
        } else {
            Err(OrderEditError::UnknownProduct(serial_number.to_string()))
        }
    }
}

/// Per-type amount of a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldStat {
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Sold", deserialize_with = "wire::count", default)]
    pub sold: u32,
}

/// `/expand_history_order/id/{order}`: a completed order and what it moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryOrder {
    #[serde(default)]
    pub order_sides: OrderSides,
    #[serde(default)]
    pub order_stats: Vec<SoldStat>,
    /// Moved products, columns as sent by the server.
    #[serde(default)]
    pub available_products: Vec<Map<String, Value>>,
}

impl HistoryOrder {
    pub fn total_sold(&self) -> u32 {
        self.order_stats.iter().map(|stat| stat.sold).sum()
    }
}
