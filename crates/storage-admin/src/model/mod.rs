//! Wire models of the storage admin server.
//!
//! Column names follow the server's response labels, most of them in Russian.

pub mod business;
pub mod catalog;
pub mod order;
pub mod order_form;
pub mod product;
pub mod statistics;

pub use business::{BusinessEntry, BusinessInfo};
pub use catalog::{ProducersAndModels, Record};
pub use order::{
    AvailableProduct, HistoryOrder, OrderDescription, OrderEditError, OrderId, OrderPackage,
    OrderSides, OrderStat, PendingOrder, RawOrderDescription, SoldStat,
};
pub use order_form::NewOrder;
pub use product::{FormError, NewProduct};
pub use statistics::StatisticsRow;

/// Deserializers for counters the server may send as numbers, decimal
/// strings (`"3"`, `"3.0"`) or `null`.
pub(crate) mod wire {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Integer(u64),
        Float(f64),
        Text(String),
    }

    fn to_u32(raw: Count) -> Result<u32, String> {
        let value = match raw {
            Count::Integer(n) => return u32::try_from(n).map_err(|e| e.to_string()),
            Count::Float(f) => f,
            Count::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("`{text}` is not a number"))?,
        };
        if value.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&value) {
            return Err(format!("{value} is not a valid count"));
        }
        Ok(value as u32)
    }

    /// Missing or `null` reads as zero.
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match Option::<Count>::deserialize(deserializer)? {
            Some(raw) => to_u32(raw).map_err(D::Error::custom),
            None => Ok(0),
        }
    }

    pub fn optional_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        Option::<Count>::deserialize(deserializer)?
            .map(to_u32)
            .transpose()
            .map_err(D::Error::custom)
    }

    /// The server compares form flags against the string `"true"`.
    pub fn form_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *flag { "true" } else { "false" })
    }

}
