use axum::{body::Bytes, extract::{Path, State}, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::db::{orders, payments::{self, Payment}, users};
use crate::domain::aggregates::OrderStatus;
use crate::domain::events::DomainEvent;
use crate::notify::{self, templates};
use crate::payments::{self as provider, webhook::{self, CHECKOUT_SESSION_COMPLETED}, CompletedCheckout, Event, ProviderError, WebhookError};
use crate::{AppState, Result, ShopError};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody { pub shipping_address: Option<String> }

#[derive(Debug, Serialize)]
pub struct CheckoutResponse { pub session_id: String, pub session_url: Option<String> }

impl From<WebhookError> for ShopError {
    fn from(e: WebhookError) -> Self { ShopError::BadRequest(e.to_string()) }
}

impl From<ProviderError> for ShopError {
    fn from(e: ProviderError) -> Self {
        tracing::error!(error = %e, "payment provider call failed");
        ShopError::Provider(e.to_string())
    }
}

pub async fn create_checkout_session(
    State(s): State<AppState>,
    p: Principal,
    Path(order_id): Path<i64>,
    body: Option<Json<CheckoutBody>>,
) -> Result<Json<CheckoutResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let order = orders::find(&s.db, order_id).await?
        .filter(|o| o.user_id == p.user_id)
        .ok_or_else(|| ShopError::BadRequest("Order does not exist or is not owned by the user.".into()))?;

    if let Some(address) = body.shipping_address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        orders::set_shipping_address(&s.db, order.id, address).await?;
    }
    if order.status() != OrderStatus::Pending || payments::exists_for_order(&s.db, order.id, p.user_id).await? {
        return Err(ShopError::BadRequest("Order has already been paid for.".into()));
    }

    let items = orders::items_for(&s.db, &[order.id]).await?;
    let request = provider::checkout_request(order.id, &items, &s.config.checkout_currency, &s.config.frontend_url)
        .map_err(|e| ShopError::Internal(format!("order {} cannot be priced: {e}", order.id)))?;
    let session = s.payments.create_checkout_session(&request).await?;
    tracing::info!(order_id = order.id, session_id = %session.id, "checkout session created");

    Ok(Json(CheckoutResponse { session_id: session.id, session_url: session.url }))
}

fn received() -> Json<serde_json::Value> { Json(serde_json::json!({ "received": true })) }

/// Provider webhook. Once the signature checks out the event is acknowledged,
/// unless recording it hit the database or the provider.
pub async fn stripe_webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<serde_json::Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok()).ok_or(WebhookError::MissingSignature)?;
    webhook::verify_signature(&body, signature, &s.config.stripe_webhook_secret, chrono::Utc::now().timestamp()).map_err(|e| {
        tracing::warn!(error = %e, "webhook signature rejected");
        e
    })?;
    let event = Event::parse(&body)?;
    tracing::info!(event_id = %event.id, kind = %event.kind, "webhook received");

    if event.kind != CHECKOUT_SESSION_COMPLETED {
        return Ok(received());
    }
    let session_id = event.object_id().ok_or_else(|| WebhookError::InvalidPayload("event object has no id".into()))?;
    let session = s.payments.retrieve_checkout_session(session_id).await?;

    let done = match CompletedCheckout::from_session(&session) {
        Ok(Some(done)) => done,
        Ok(None) => {
            tracing::info!(session_id, status = %session.payment_status, "checkout session not paid yet");
            return Ok(received());
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot reconcile checkout session");
            return Ok(received());
        }
    };
    record_payment(&s, done, session.currency.as_deref()).await?;
    Ok(received())
}

async fn record_payment(s: &AppState, done: CompletedCheckout, currency: Option<&str>) -> Result<()> {
    let Some(order) = orders::find(&s.db, done.order_id).await? else {
        tracing::warn!(order_id = done.order_id, session_id = %done.session_id, "paid session for unknown order");
        return Ok(());
    };
    if payments::exists_for_order(&s.db, order.id, order.user_id).await? {
        tracing::info!(order_id = order.id, "payment already recorded");
        return Ok(());
    }

    let status = order.status();
    let session_id = done.session_id.clone();
    let amount_paid = done.amount_paid;
    let receipt_url = done.receipt_url.clone();

    let mut tx = s.db.begin().await?;
    if status.can_transition_to(OrderStatus::Paid) {
        orders::set_status(&mut *tx, order.id, OrderStatus::Paid).await?;
    } else if status != OrderStatus::Paid {
        tracing::warn!(order_id = order.id, %status, "payment received for an order that cannot become paid");
    }
    payments::insert(&mut *tx, &done.into_payment(order.user_id)).await?;
    tx.commit().await?;
    tracing::info!(order_id = order.id, %session_id, amount = %amount_paid, "order paid");

    s.events.publish(DomainEvent::OrderPaid { order_id: order.id, session_id, amount_paid }).await;

    match users::find(&s.db, order.user_id).await? {
        Some(user) => {
            let currency = currency.unwrap_or(&s.config.checkout_currency);
            let message = templates::payment_confirmation(&user.email, order.id, amount_paid, currency, receipt_url.as_deref());
            notify::send_detached(s.mailer.clone(), message);
        }
        None => tracing::warn!(order_id = order.id, user_id = order.user_id, "order owner vanished, no confirmation sent"),
    }
    Ok(())
}

pub async fn list_payments(State(s): State<AppState>, p: Principal) -> Result<Json<Vec<Payment>>> {
    let owner = if p.is_admin() { None } else { Some(p.user_id) };
    Ok(Json(payments::list(&s.db, owner).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_webhook_errors_are_bad_requests() {
        assert_eq!(ShopError::from(WebhookError::Mismatch).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ShopError::from(WebhookError::MissingSignature).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_provider_errors_are_bad_gateway() {
        let e = ProviderError::Api { status: 402, message: "card declined".into() };
        let err = ShopError::from(e);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Payment provider error: payment provider answered 402: card declined");
    }
}
