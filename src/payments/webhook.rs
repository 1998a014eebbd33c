//! Provider webhook: signature check and the mapping from a completed
//! checkout session to the local payment record.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::db::payments::NewPayment;
use crate::domain::value_objects::Money;
use crate::payments::provider::CheckoutSession;

type HmacSha256 = Hmac<Sha256>;

/// Signatures older than this many seconds are refused.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("no signature matches the payload")]
    Mismatch,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("checkout session {0} carries no order_id metadata")]
    MissingOrder(String),
}

/// Verifies a `t=<unix>,v1=<hex>[,v1=<hex>...]` header against the raw body.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=').ok_or(WebhookError::MalformedHeader)?;
        match key {
            "t" => timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?),
            "v1" => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::Expired);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::Mismatch)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().filter_map(|s| hex::decode(s).ok()).any(|sig| mac.clone().verify_slice(&sig).is_ok());
    if matched { Ok(()) } else { Err(WebhookError::Mismatch) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData { pub object: serde_json::Value }

impl Event {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// Id of the object the event is about (the session id for checkout events).
    pub fn object_id(&self) -> Option<&str> { self.data.object.get("id").and_then(|v| v.as_str()) }
}

/// A paid checkout session, reduced to what the shop records.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCheckout {
    pub order_id: i64,
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub amount_paid: Decimal,
    pub paid_at: DateTime<Utc>,
    pub receipt_url: Option<String>,
}

impl CompletedCheckout {
    /// `Ok(None)` when the session has not been paid yet.
    pub fn from_session(session: &CheckoutSession) -> Result<Option<Self>, WebhookError> {
        if session.payment_status != "paid" {
            return Ok(None);
        }
        let order_id = session.metadata.get("order_id")
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| WebhookError::MissingOrder(session.id.clone()))?;
        Ok(Some(Self {
            order_id,
            session_id: session.id.clone(),
            payment_intent_id: session.payment_intent_id().map(String::from),
            amount_paid: Money::from_minor_units(session.amount_total.unwrap_or(0), session.currency.as_deref().unwrap_or("gbp")).amount(),
            paid_at: Utc.timestamp_opt(session.created, 0).single().unwrap_or_else(Utc::now),
            receipt_url: session.receipt_url().map(String::from),
        }))
    }

    pub fn into_payment(self, user_id: i64) -> NewPayment {
        NewPayment {
            user_id,
            order_id: self.order_id,
            payment_method: "card".to_string(),
            payment_intent_id: self.payment_intent_id,
            session_id: self.session_id,
            amount_paid: self.amount_paid,
            payment_date: self.paid_at,
            receipt_url: self.receipt_url,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    pub(crate) fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let now = Utc::now().timestamp();
        assert_eq!(verify_signature(body, &sign(body, SECRET, now), SECRET, now), Ok(()));
    }

    #[test]
    fn wrong_secret_or_modified_body() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let now = Utc::now().timestamp();
        assert_eq!(verify_signature(body, &sign(body, "other", now), SECRET, now), Err(WebhookError::Mismatch));
        let header = sign(body, SECRET, now);
        assert_eq!(verify_signature(br#"{"type":"x"}"#, &header, SECRET, now), Err(WebhookError::Mismatch));
    }

    #[test]
    fn stale_timestamp() {
        let body = b"{}";
        let now = Utc::now().timestamp();
        let header = sign(body, SECRET, now - 600);
        assert_eq!(verify_signature(body, &header, SECRET, now), Err(WebhookError::Expired));
    }

    #[test]
    fn malformed_headers() {
        let now = Utc::now().timestamp();
        assert_eq!(verify_signature(b"{}", "garbage", SECRET, now), Err(WebhookError::MalformedHeader));
        assert_eq!(verify_signature(b"{}", "v1=abc", SECRET, now), Err(WebhookError::MalformedHeader));
        assert_eq!(verify_signature(b"{}", &format!("t={now}"), SECRET, now), Err(WebhookError::MalformedHeader));
    }

    #[test]
    fn any_of_several_signatures_may_match() {
        let body = b"{}";
        let now = Utc::now().timestamp();
        let good = sign(body, SECRET, now);
        let header = format!("{good},v1=deadbeef");
        assert_eq!(verify_signature(body, &header, SECRET, now), Ok(()));
    }

    fn session(status: &str, metadata: serde_json::Value) -> CheckoutSession {
        serde_json::from_value(serde_json::json!({
            "id": "cs_1", "payment_status": status, "amount_total": 6500, "created": 1_700_000_000,
            "metadata": metadata,
            "payment_intent": { "id": "pi_1", "latest_charge": { "id": "ch_1", "receipt_url": "https://r" } }
        })).unwrap()
    }

    #[test]
    fn paid_session_becomes_payment() {
        let done = CompletedCheckout::from_session(&session("paid", serde_json::json!({"order_id": "12"}))).unwrap().unwrap();
        assert_eq!(done.order_id, 12);
        assert_eq!(done.amount_paid, Decimal::new(6500, 2));
        assert_eq!(done.paid_at.timestamp(), 1_700_000_000);
        let payment = done.into_payment(3);
        assert_eq!(payment.user_id, 3);
        assert_eq!(payment.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(payment.receipt_url.as_deref(), Some("https://r"));
        assert_eq!(payment.payment_method, "card");
    }

    #[test]
    fn unpaid_session_is_ignored() {
        assert_eq!(CompletedCheckout::from_session(&session("unpaid", serde_json::json!({"order_id": "12"}))), Ok(None));
    }

    #[test]
    fn paid_session_without_order() {
        let err = CompletedCheckout::from_session(&session("paid", serde_json::json!({}))).unwrap_err();
        assert_eq!(err, WebhookError::MissingOrder("cs_1".into()));
    }

    #[test]
    fn event_object_id() {
        let e = Event::parse(br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#).unwrap();
        assert_eq!(e.kind, CHECKOUT_SESSION_COMPLETED);
        assert_eq!(e.object_id(), Some("cs_1"));
        assert!(Event::parse(b"not json").is_err());
    }
}
