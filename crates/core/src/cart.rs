//! Shopping cart line-item aggregation.
//!
//! A line's identity is `"{product}:{option}"`, so the same formula bought
//! monthly and as a 30-pack are two separate lines. Prices are resolved from
//! the pricing tables when a line is built; the cart never trusts a price
//! supplied by the browser.
//!
//! Every subscription unit becomes its own order at checkout, so a line holds
//! at most [`MAX_LINE_QUANTITY`] units.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ProductKind, PurchaseOption};
use crate::pricing::{self, PricingError};
use crate::types::Money;

/// Most units a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Errors from cart edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("quantity must be between 1 and {max}", max = MAX_LINE_QUANTITY)]
    QuantityOutOfRange,

    #[error("no cart line {0}")]
    UnknownLine(String),
}

fn check_quantity(quantity: u32) -> Result<u32, CartError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(CartError::QuantityOutOfRange)
    }
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub product: ProductKind,
    pub option: PurchaseOption,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartItem {
    /// Build a line priced from the pricing tables.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Pricing`] when the product is not sold with the
    /// requested purchase option, or [`CartError::QuantityOutOfRange`] outside
    /// `1..=MAX_LINE_QUANTITY`.
    pub fn priced(
        product: ProductKind,
        option: PurchaseOption,
        quantity: u32,
    ) -> Result<Self, CartError> {
        let quantity = check_quantity(quantity)?;
        let unit_price = pricing::purchase_price(product, option)?;
        Ok(Self {
            id: Self::key(product, option),
            product,
            option,
            name: product.display_name().to_owned(),
            unit_price,
            quantity,
        })
    }

    /// Line identity for a product + purchase option.
    #[must_use]
    pub fn key(product: ProductKind, option: PurchaseOption) -> String {
        format!("{product}:{}", option.key())
    }

    /// Unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Session cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line, merging quantities with an existing line of the same id.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOutOfRange`] if the merged line would
    /// exceed [`MAX_LINE_QUANTITY`]; the cart is left unchanged.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                existing.quantity = check_quantity(existing.quantity.saturating_add(item.quantity))?;
            }
            None => {
                check_quantity(item.quantity)?;
                self.items.push(item);
            }
        }
        Ok(())
    }

    /// Set a line's quantity; zero or negative removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownLine`] when no line has that id, or
    /// [`CartError::QuantityOutOfRange`] above [`MAX_LINE_QUANTITY`].
    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return if self.remove_item(item_id) {
                Ok(())
            } else {
                Err(CartError::UnknownLine(item_id.to_owned()))
            };
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| CartError::QuantityOutOfRange)
            .and_then(check_quantity)?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| CartError::UnknownLine(item_id.to_owned()))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Take one unit off a line, dropping the line at zero.
    ///
    /// Returns `false` when no line has that id.
    pub fn remove_one(&mut self, item_id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) else {
            return false;
        };
        item.quantity = item.quantity.saturating_sub(1);
        self.items.retain(|item| item.quantity > 0);
        true
    }

    /// Remove a line. Returns `false` when no line has that id.
    pub fn remove_item(&mut self, item_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Σ unit price × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Σ quantity.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::catalog::{BillingFrequency, PackageTier};

    use super::*;

    fn monthly(product: ProductKind, quantity: u32) -> CartItem {
        CartItem::priced(
            product,
            PurchaseOption::Subscription {
                frequency: BillingFrequency::Monthly,
            },
            quantity,
        )
        .unwrap()
    }

    #[test]
    fn test_same_key_merges_quantity() {
        let mut cart = Cart::new();
        cart.add_item(monthly(ProductKind::Vision, 1)).unwrap();
        cart.add_item(monthly(ProductKind::Vision, 2)).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal().amount, dec!(119.97));
    }

    #[test]
    fn test_different_option_is_distinct_line() {
        let mut cart = Cart::new();
        cart.add_item(monthly(ProductKind::Vision, 1)).unwrap();
        cart.add_item(
            CartItem::priced(
                ProductKind::Vision,
                PurchaseOption::Distributor {
                    tier: PackageTier::Ten,
                },
                1,
            )
            .unwrap(),
        )
        .unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items().get(1).unwrap().id, "vision:distributor-10");
        assert_eq!(cart.subtotal().amount, dec!(688.99));
    }

    #[test]
    fn test_update_quantity_removes_at_zero_or_below() {
        let mut cart = Cart::new();
        cart.add_item(monthly(ProductKind::Neuro, 2)).unwrap();
        cart.add_item(monthly(ProductKind::Fortify, 1)).unwrap();

        cart.update_quantity("neuro:monthly", 5).unwrap();
        assert_eq!(cart.item_count(), 6);

        cart.update_quantity("neuro:monthly", 0).unwrap();
        cart.update_quantity("fortify:monthly", -3).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().amount, dec!(0));
    }

    #[test]
    fn test_unknown_line_is_reported() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.update_quantity("vision:annual", 1),
            Err(CartError::UnknownLine("vision:annual".into()))
        );
        assert!(cart.update_quantity("vision:annual", 0).is_err());
        assert!(!cart.remove_item("vision:annual"));
        assert!(!cart.remove_one("vision:annual"));
    }

    #[test]
    fn test_line_quantity_is_bounded() {
        let option = PurchaseOption::Subscription {
            frequency: BillingFrequency::Monthly,
        };
        assert!(CartItem::priced(ProductKind::Vision, option, MAX_LINE_QUANTITY).is_ok());
        assert_eq!(
            CartItem::priced(ProductKind::Vision, option, MAX_LINE_QUANTITY + 1),
            Err(CartError::QuantityOutOfRange)
        );
        assert_eq!(
            CartItem::priced(ProductKind::Vision, option, 0),
            Err(CartError::QuantityOutOfRange)
        );

        let mut cart = Cart::new();
        cart.add_item(monthly(ProductKind::Vision, 6)).unwrap();
        assert_eq!(
            cart.add_item(monthly(ProductKind::Vision, 5)),
            Err(CartError::QuantityOutOfRange)
        );
        assert_eq!(cart.item_count(), 6);
        cart.add_item(monthly(ProductKind::Vision, 4)).unwrap();
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);

        assert_eq!(
            cart.update_quantity("vision:monthly", i64::from(MAX_LINE_QUANTITY) + 1),
            Err(CartError::QuantityOutOfRange)
        );
        assert_eq!(
            cart.update_quantity("vision:monthly", 4_000_000_000),
            Err(CartError::QuantityOutOfRange)
        );
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_remove_one_drops_empty_line() {
        let mut cart = Cart::new();
        cart.add_item(monthly(ProductKind::Neuro, 2)).unwrap();
        assert!(cart.remove_one("neuro:monthly"));
        assert_eq!(cart.item_count(), 1);
        assert!(cart.remove_one("neuro:monthly"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_priced_rejects_unsold_option() {
        let err = CartItem::priced(ProductKind::Vision, PurchaseOption::OneTime, 1);
        assert!(matches!(
            err,
            Err(CartError::Pricing(PricingError::NoOneTimePrice { .. }))
        ));
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(monthly(ProductKind::Complete, 1)).unwrap();
        cart.clear();
        assert_eq!(cart.item_count(), 0);
    }
}
