use serde::{Deserialize, Serialize};

use catalog_core::ProductId;

/// A catalog product.
///
/// Plain value: no interior state, no owned resources. Price is expected to be
/// non-negative but that is left to whoever builds the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_covers_every_field() {
        let a = Product::new("p1", "Red Mug", "Ceramic mug, red glaze", 9.99);
        let b = Product::new("p1", "Blue Mug", "Ceramic mug, blue glaze", 11.0);

        assert_eq!(a.id, b.id);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn serializes_with_id_alongside_fields() {
        let value = serde_json::to_value(Product::new("p1", "Red Mug", "", 9.99)).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["price"], 9.99);
    }
}
