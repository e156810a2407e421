//! Document codec: `Product` <-> engine payload.
//!
//! The engine keys documents externally, so the payload carries every field of
//! a product except its id. Decoding is the only place a raw engine payload is
//! interpreted as structured data.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use catalog_core::error::DecodeError;
use catalog_core::ProductId;

use crate::product::Product;

/// Engine-facing shape of a product. Never carries the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl StoredDocument {
    /// Parse an already-deserialized JSON payload.
    pub fn from_value(id: &str, payload: JsonValue) -> Result<Self, DecodeError> {
        serde_json::from_value(payload).map_err(|e| DecodeError::new(id, e))
    }

    /// Parse raw payload bytes.
    pub fn from_slice(id: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(payload).map_err(|e| DecodeError::new(id, e))
    }

    /// Reattach the external key.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
        }
    }
}

impl From<&Product> for StoredDocument {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price,
        }
    }
}

/// Drop the id; total.
pub fn encode(product: &Product) -> StoredDocument {
    StoredDocument::from(product)
}

/// Rebuild a product from a stored payload and its externally supplied key.
pub fn decode(payload: JsonValue, id: impl Into<ProductId>) -> Result<Product, DecodeError> {
    let id = id.into();
    let doc = StoredDocument::from_value(id.as_str(), payload)?;
    Ok(doc.into_product(id))
}
