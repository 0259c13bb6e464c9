//! Catalog product record.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product in the store catalog.
///
/// Read-only from the client's point of view; products are created through
/// the admin form and otherwise only displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Units in stock.
    #[serde(default, alias = "stock")]
    pub quantity: u32,
    /// Category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Whether the product is shown in the featured section.
    #[serde(default)]
    pub featured: bool,
    /// Image URL.
    #[serde(
        default,
        alias = "image",
        alias = "imageUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

impl Product {
    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_deserialize_minimal_backend_shape() {
        let json = r#"{"id": 3, "name": "Mug", "description": "Ceramic", "quantity": 4, "price": 9.5}"#;
        let product: Product = serde_json::from_str(json).unwrap();

        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price.amount(), Decimal::new(95, 1));
        assert!(!product.featured);
        assert!(product.category.is_none());
        assert!(product.image_url.is_none());
        assert!(product.in_stock());
    }

    #[test]
    fn test_image_field_aliases() {
        let json = r#"{"id": 1, "name": "Cap", "price": 12, "imageUrl": "https://cdn.example/cap.png"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://cdn.example/cap.png")
        );
        assert!(!product.in_stock());
    }
}
