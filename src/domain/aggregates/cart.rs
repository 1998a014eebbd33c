//! Cart Aggregate

use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domain::value_objects::{Money, Quantity};

/// In-memory view of one cart and its lines, priced at current catalog prices.
#[derive(Clone, Debug)]
pub struct Cart {
    id: Uuid,
    user_id: i64,
    completed: bool,
    items: Vec<CartLine>,
    currency: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub product_id: i64,
    pub title: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl CartLine {
    pub fn new(product_id: i64, title: impl Into<String>, quantity: u32, unit_price: Decimal, currency: &str) -> Self {
        Self { product_id, title: title.into(), quantity: Quantity::new(quantity), unit_price: Money::new(unit_price, currency) }
    }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
}

/// What a delete on a cart line did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement { Reduced(u32), Removed }

impl Cart {
    pub fn new(id: Uuid, user_id: i64, completed: bool, currency: &str) -> Self {
        Self { id, user_id, completed, items: vec![], currency: currency.to_lowercase() }
    }

    pub fn with_items(mut self, items: Vec<CartLine>) -> Self {
        for item in items { self.add_item(item); }
        self
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> i64 { self.user_id }
    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn total(&self) -> Money {
        self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity.value()).sum()
    }

    /// Adds a line, merging quantities with an existing line for the same product.
    pub fn add_item(&mut self, item: CartLine) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.add(item.quantity.value());
        } else {
            self.items.push(item);
        }
    }

    pub fn set_quantity(&mut self, product_id: i64, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        item.quantity = Quantity::new(quantity);
        Ok(())
    }

    /// Takes one unit off a line; the line goes away instead of reaching zero.
    pub fn decrement(&mut self, product_id: i64) -> Result<Decrement, CartError> {
        let pos = self.items.iter().position(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        match self.items[pos].quantity.subtract(1) {
            Some(q) if !q.is_zero() => {
                self.items[pos].quantity = q;
                Ok(Decrement::Reduced(q.value()))
            }
            _ => {
                self.items.remove(pos);
                Ok(Decrement::Removed)
            }
        }
    }

    /// Reopens a completed cart so the customer can shop with it again.
    pub fn reopen(&mut self) -> bool {
        let was_completed = self.completed;
        self.completed = false;
        was_completed
    }
}

/// Next quantity for a line when `current` units exist and `delta` more are added.
pub fn merged_quantity(current: Option<i32>, delta: i32) -> Result<i32, CartError> {
    if delta <= 0 { return Err(CartError::InvalidQuantity); }
    current.unwrap_or(0).checked_add(delta).ok_or(CartError::InvalidQuantity)
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ItemNotFound => write!(f, "Item not found"), Self::InvalidQuantity => write!(f, "Quantity must be at least 1") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(qty: u32) -> CartLine { CartLine::new(1, "Widget", qty, Decimal::new(1050, 2), "gbp") }

    #[test]
    fn test_cart_totals() {
        let cart = Cart::new(Uuid::new_v4(), 7, false, "gbp")
            .with_items(vec![widget(2), CartLine::new(2, "Gadget", 1, Decimal::new(399, 2), "gbp")]);
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total().amount(), Decimal::new(2499, 2));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new(Uuid::new_v4(), 7, false, "gbp");
        cart.add_item(widget(2));
        cart.add_item(widget(1));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 3);
    }

    #[test]
    fn test_decrement_then_remove() {
        let mut cart = Cart::new(Uuid::new_v4(), 7, false, "gbp").with_items(vec![widget(2)]);
        assert_eq!(cart.decrement(1), Ok(Decrement::Reduced(1)));
        assert_eq!(cart.decrement(1), Ok(Decrement::Removed));
        assert!(cart.is_empty());
        assert_eq!(cart.decrement(1), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_set_quantity_rejects_zero() {
        let mut cart = Cart::new(Uuid::new_v4(), 7, false, "gbp").with_items(vec![widget(2)]);
        assert_eq!(cart.set_quantity(1, 0), Err(CartError::InvalidQuantity));
        cart.set_quantity(1, 5).unwrap();
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_reopen_completed_cart() {
        let mut cart = Cart::new(Uuid::new_v4(), 7, true, "gbp");
        assert!(cart.reopen());
        assert!(!cart.reopen());
    }

    #[test]
    fn test_merged_quantity() {
        assert_eq!(merged_quantity(None, 2), Ok(2));
        assert_eq!(merged_quantity(Some(3), 2), Ok(5));
        assert_eq!(merged_quantity(Some(3), 0), Err(CartError::InvalidQuantity));
    }
}
