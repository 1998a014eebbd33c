//! Order Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::aggregates::cart::Cart;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Paid, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// pending -> paid | cancelled, paid -> delivered | cancelled. Delivered and cancelled are final.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid) | (Self::Pending, Self::Cancelled) | (Self::Paid, Self::Delivered) | (Self::Paid, Self::Cancelled)
        )
    }

    pub fn transition(&self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        if self.can_transition_to(next) { Ok(next) } else { Err(OrderError::InvalidTransition { from: *self, to: next }) }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Largest total an order row can hold (NUMERIC(12, 2)).
// `Decimal::new` is not const; these parts encode 999_999_999_999 with scale 2.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// A line copied out of a cart at checkout; `unit_price` is frozen from here on.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine { pub product_id: i64, pub quantity: u32, pub unit_price: Decimal }

impl OrderLine {
    pub fn total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

/// An order about to be written: cart lines snapshotted at their current price.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub user_id: i64,
    pub cart_id: uuid::Uuid,
    pub shipping_address: String,
    pub lines: Vec<OrderLine>,
    total: Money,
}

impl OrderDraft {
    pub fn from_cart(cart: &Cart, shipping_address: impl Into<String>) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let total = cart.total();
        if total.amount() > MAX_ORDER_TOTAL { return Err(OrderError::TotalTooLarge); }
        let lines = cart.items().iter()
            .map(|i| OrderLine { product_id: i.product_id, quantity: i.quantity.value(), unit_price: i.unit_price.amount() })
            .collect();
        Ok(Self {
            user_id: cart.user_id(),
            cart_id: cart.id(),
            shipping_address: shipping_address.into(),
            lines,
            total,
        })
    }

    pub fn total_cost(&self) -> Decimal { self.total.amount() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, TotalTooLarge, UnknownStatus(String), InvalidTransition { from: OrderStatus, to: OrderStatus } }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "no items in cart"),
            Self::TotalTooLarge => write!(f, "order total is too large"),
            Self::UnknownStatus(s) => write!(f, "unknown order status '{s}'"),
            Self::InvalidTransition { from, to } => write!(f, "cannot move an order from {from} to {to}"),
        }
    }
}
