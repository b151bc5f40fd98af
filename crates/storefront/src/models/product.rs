//! Catalog product rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitalis_core::{ProductId, ProductKind};

/// A product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub base_price: Decimal,
    pub category: String,
    pub description: Option<String>,
}

impl Product {
    /// Catalog kind, when the row's id is one the pricing tables know.
    #[must_use]
    pub fn kind(&self) -> Option<ProductKind> {
        self.id.as_str().parse().ok()
    }
}

/// Insert model for `product`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub base_price: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewProduct {
    /// Catalog row for a product, priced at its monthly list price.
    #[must_use]
    pub fn from_catalog(kind: ProductKind) -> Self {
        Self {
            id: ProductId::new(kind.as_str()),
            name: kind.display_name().to_string(),
            base_price: vitalis_core::pricing::base_price(kind).amount,
            category: kind.category().to_string(),
            description: None,
        }
    }
}

/// Partial update for `product`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_from_catalog() {
        let product = NewProduct::from_catalog(ProductKind::Fortify);
        assert_eq!(product.id.as_str(), "fortify");
        assert_eq!(product.name, "Fortify Formula");
        assert_eq!(product.base_price, dec!(34.99));
        assert_eq!(product.category, "supplement");
    }
}
