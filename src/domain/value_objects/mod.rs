//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL slug derived from a category title
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(SlugError::Empty); }
        if value.len() > 255 { return Err(SlugError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SlugError::InvalidChar);
        }
        Ok(Self(value))
    }

    /// Lowercases, keeps ASCII alphanumerics and collapses everything else into single dashes.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(title.len());
        for c in title.trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        Self::new(slug.trim_end_matches('-'))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty, TooLong, InvalidChar }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "slug empty"),
            Self::TooLong => write!(f, "slug too long"),
            Self::InvalidChar => write!(f, "slug may only contain letters, digits, '-' and '_'"),
        }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_lowercase() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Amount in the currency's minor unit (pence, cents), rounded half away from zero.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }

    pub fn from_minor_units(minor: i64, currency: &str) -> Self { Self::new(Decimal::new(minor, 2), currency) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::CurrencyMismatch => write!(f, "Currency mismatch"), Self::Overflow => write!(f, "Amount out of range") }
    }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_title() {
        assert_eq!(Slug::from_title("  Men's Shoes & Boots ").unwrap().as_str(), "men-s-shoes-boots");
        assert_eq!(Slug::from_title("Electronics").unwrap().as_str(), "electronics");
        assert_eq!(Slug::from_title("***"), Err(SlugError::Empty));
    }

    #[test]
    fn test_slug_rejects_spaces() {
        assert_eq!(Slug::new("two words"), Err(SlugError::InvalidChar));
    }

    #[test]
    fn test_money_add() {
        let a = Money::new(Decimal::new(1050, 2), "gbp");
        let b = Money::new(Decimal::new(250, 2), "GBP");
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(1300, 2));
        assert_eq!(a.add(&Money::zero("usd")), Err(MoneyError::CurrencyMismatch));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::new(Decimal::new(1999, 2), "gbp").to_minor_units().unwrap(), 1999);
        assert_eq!(Money::new(Decimal::new(5, 0), "gbp").to_minor_units().unwrap(), 500);
        assert_eq!(Money::from_minor_units(4250, "gbp").amount(), Decimal::new(4250, 2));
    }

    #[test]
    fn test_quantity_arithmetic() {
        assert_eq!(Quantity::new(3).add(2).value(), 5);
        assert!(Quantity::new(1).subtract(1).unwrap().is_zero());
        assert!(Quantity::new(1).subtract(2).is_none());
    }
}
