//! Product model

use serde::{Deserialize, Serialize};

use super::validation::{require_text, ValidationError};

/// A product as stored and as sent over the wire.
///
/// Missing JSON fields decode to their zero value and are then caught by
/// `validate`. `Id` in a request body is ignored; the path or the server
/// decides it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub delivery_price: f64,
}

impl Product {
    /// Check every field, reporting all violations together.
    ///
    /// # Example
    /// ```
    /// use products_server::models::Product;
    ///
    /// let product = Product {
    ///     name: "Galaxy S7".into(),
    ///     description: "Newest mobile product from Samsung.".into(),
    ///     price: 1024.99,
    ///     delivery_price: 16.99,
    ///     ..Default::default()
    /// };
    /// assert!(product.validate().is_ok());
    /// assert!(Product::default().validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        require_text("name", &self.name, &mut errors);
        require_text("description", &self.description, &mut errors);
        if self.price <= 0.0 {
            errors.push(ValidationError::NotPositive { field: "price" });
        }
        if self.delivery_price < 0.0 {
            errors.push(ValidationError::Negative {
                field: "delivery price",
            });
        }
        ValidationError::collect(errors)
    }
}
