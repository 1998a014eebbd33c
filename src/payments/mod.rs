//! Payment provider integration.
pub mod provider;
pub mod webhook;

pub use provider::{CheckoutLineItem, CheckoutRequest, CheckoutSession, PaymentProvider, ProviderError, StripeClient};
pub use webhook::{CompletedCheckout, Event, WebhookError};

use crate::db::orders::OrderItemRow;
use crate::domain::value_objects::{Money, MoneyError};

/// One provider line per order item, priced at the snapshot taken at checkout.
pub fn checkout_request(order_id: i64, items: &[OrderItemRow], currency: &str, frontend_url: &str) -> Result<CheckoutRequest, MoneyError> {
    let line_items = items.iter()
        .map(|i| {
            Ok(CheckoutLineItem {
                name: i.title.clone(),
                image: Some(i.image.clone()).filter(|u| !u.is_empty()),
                unit_amount: Money::new(i.price, currency).to_minor_units()?,
                quantity: i.quantity.max(0) as u32,
            })
        })
        .collect::<Result<Vec<_>, MoneyError>>()?;
    let frontend = frontend_url.trim_end_matches('/');
    Ok(CheckoutRequest {
        order_id,
        currency: currency.to_lowercase(),
        line_items,
        success_url: format!("{frontend}/payment/confirm/?success=true"),
        cancel_url: format!("{frontend}/payment/cancel/?canceled=true"),
    })
}
