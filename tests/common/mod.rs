#![allow(dead_code)]

use hmac::{Hmac, Mac};
use sha2::Sha256;

use shopit::AppConfig;

pub const WEBHOOK_SECRET: &str = "whsec_router_tests";

pub fn config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.into(),
        database_max_connections: 2,
        port: 0,
        jwt_secret: "router-test-secret".into(),
        jwt_ttl_hours: 24,
        stripe_secret_key: "sk_test".into(),
        stripe_webhook_secret: WEBHOOK_SECRET.into(),
        stripe_api_base: "http://127.0.0.1:1".into(),
        checkout_currency: "gbp".into(),
        frontend_url: "https://eeki.shop".into(),
        email_from: "noreply@eeki.shop".into(),
        brevo_api_key: None,
        nats_url: None,
        cors_origins: vec![],
        product_page_size: 10,
    }
}

pub async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// `stripe-signature` header for `payload` signed at `timestamp`.
pub fn sign(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
