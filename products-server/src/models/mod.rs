//! Domain models with validation
//!
//! Request bodies decode leniently and are checked with `validate`.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod product;
pub mod option;

use serde::{Deserialize, Serialize};

pub use validation::ValidationError;
pub use product::Product;
pub use option::ProductOption;

/// List response wrapper: `{"Items": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}
