//! Product option model

use serde::{Deserialize, Serialize};

use super::validation::{require_text, ValidationError};

/// A named variant of a product (colour, capacity, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductOption {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl ProductOption {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        require_text("name", &self.name, &mut errors);
        require_text("description", &self.description, &mut errors);
        ValidationError::collect(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_rejected() {
        let option = ProductOption {
            name: "White".into(),
            ..Default::default()
        };
        assert_eq!(
            option.validate().unwrap_err(),
            ValidationError::Empty {
                field: "description"
            }
        );
    }
}
