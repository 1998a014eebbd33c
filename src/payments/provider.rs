//! Hosted checkout sessions with Stripe, spoken over its form-encoded REST API.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to payment provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment provider answered {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLineItem { pub name: String, pub image: Option<String>, pub unit_amount: i64, pub quantity: u32 }

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub order_id: i64,
    pub currency: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession { pub id: String, pub url: Option<String> }

/// A provider object that is either an id or, when expanded, the object itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> { Id(String), Object(Box<T>) }

impl<T> Expandable<T> {
    pub fn as_object(&self) -> Option<&T> {
        match self { Self::Object(o) => Some(o), Self::Id(_) => None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Charge { pub id: String, pub receipt_url: Option<String> }

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent { pub id: String, pub latest_charge: Option<Expandable<Charge>> }

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub created: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
}

impl CheckoutSession {
    pub fn payment_intent_id(&self) -> Option<&str> {
        match self.payment_intent.as_ref()? {
            Expandable::Id(id) => Some(id),
            Expandable::Object(pi) => Some(&pi.id),
        }
    }

    pub fn receipt_url(&self) -> Option<&str> {
        let intent = self.payment_intent.as_ref()?.as_object()?;
        intent.latest_charge.as_ref()?.as_object()?.receipt_url.as_deref()
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CreatedSession, ProviderError>;
    /// Fetches a session with its payment intent and latest charge expanded.
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ProviderError>;
}

#[derive(Clone)]
pub struct StripeClient { http: reqwest::Client, secret_key: String, api_base: String }

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        #[derive(Deserialize)] struct ApiErrorBody { error: ApiErrorDetail }
        #[derive(Deserialize)] struct ApiErrorDetail { message: Option<String> }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body).ok().and_then(|b| b.error.message).unwrap_or(body);
        Err(ProviderError::Api { status: status.as_u16(), message })
    }
}

/// Flattens a checkout request into Stripe's bracketed form fields.
pub fn checkout_form(req: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
        ("metadata[order_id]".to_string(), req.order_id.to_string()),
    ];
    for (i, item) in req.line_items.iter().enumerate() {
        let p = format!("line_items[{i}]");
        form.push((format!("{p}[price_data][currency]"), req.currency.clone()));
        form.push((format!("{p}[price_data][product_data][name]"), item.name.clone()));
        if let Some(image) = &item.image {
            form.push((format!("{p}[price_data][product_data][images][0]"), image.clone()));
        }
        form.push((format!("{p}[price_data][unit_amount]"), item.unit_amount.to_string()));
        form.push((format!("{p}[quantity]"), item.quantity.to_string()));
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CreatedSession, ProviderError> {
        let resp = self.http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(req))
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ProviderError> {
        let resp = self.http
            .get(format!("{}/v1/checkout/sessions/{id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .query(&[("expand[]", "payment_intent.latest_charge")])
            .send()
            .await?;
        Self::parse(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            order_id: 12,
            currency: "gbp".into(),
            line_items: vec![
                CheckoutLineItem { name: "Lamp".into(), image: Some("https://img/lamp.png".into()), unit_amount: 1250, quantity: 2 },
                CheckoutLineItem { name: "Rug".into(), image: None, unit_amount: 4000, quantity: 1 },
            ],
            success_url: "https://shop/payment/confirm/?success=true".into(),
            cancel_url: "https://shop/payment/cancel/?canceled=true".into(),
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn form_has_bracketed_line_items() {
        let form = checkout_form(&request());
        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "metadata[order_id]"), Some("12"));
        assert_eq!(field(&form, "line_items[0][price_data][unit_amount]"), Some("1250"));
        assert_eq!(field(&form, "line_items[0][price_data][product_data][images][0]"), Some("https://img/lamp.png"));
        assert_eq!(field(&form, "line_items[1][quantity]"), Some("1"));
        assert_eq!(field(&form, "line_items[1][price_data][product_data][images][0]"), None);
        assert_eq!(field(&form, "line_items[1][price_data][currency]"), Some("gbp"));
    }

    #[test]
    fn expanded_session_exposes_receipt() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "amount_total": 6500,
            "currency": "gbp",
            "created": 1_700_000_000,
            "metadata": { "order_id": "12" },
            "payment_intent": { "id": "pi_1", "latest_charge": { "id": "ch_1", "receipt_url": "https://pay/receipt" } }
        })).unwrap();
        assert_eq!(session.payment_intent_id(), Some("pi_1"));
        assert_eq!(session.receipt_url(), Some("https://pay/receipt"));
    }

    #[test]
    fn unexpanded_session_has_intent_id_only() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_2", "payment_status": "unpaid", "amount_total": null, "created": 1, "payment_intent": "pi_2"
        })).unwrap();
        assert_eq!(session.payment_intent_id(), Some("pi_2"));
        assert_eq!(session.receipt_url(), None);
        assert!(session.metadata.is_empty());
    }
}
