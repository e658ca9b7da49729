use super::wire;
use serde::Serialize;

/// Rejected form input. Nothing is sent when a form fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must not contain '/'")]
    Slash(&'static str),
}

/// Form for adding a product to the active business's storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub serial_number: String,
    pub type_name: String,
    pub model: String,
    #[serde(rename = "producent")]
    pub producer: String,
    /// Serviceable on arrival.
    #[serde(serialize_with = "wire::form_flag")]
    pub product_condition: bool,
    pub additional_info: String,
}

impl NewProduct {
    pub fn new(
        serial_number: impl Into<String>,
        type_name: impl Into<String>,
        model: impl Into<String>,
        producer: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            type_name: type_name.into(),
            model: model.into(),
            producer: producer.into(),
            product_condition: true,
            additional_info: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        for (field, value) in [
            ("serial number", &self.serial_number),
            ("type", &self.type_name),
            ("model", &self.model),
            ("producer", &self.producer),
        ] {
            if value.trim().is_empty() {
                return Err(FormError::Missing(field));
            }
        }
        // Serial numbers end up in request paths.
        if self.serial_number.contains('/') {
            return Err(FormError::Slash("serial number"));
        }
        Ok(())
    }
}
