//! Checkout and payment flows against a real Postgres. They run only when
//! `DATABASE_URL` points at a database the migrations may be applied to.

mod common;

use async_trait::async_trait;
use axum::{body::Body, http::{Method, Request, StatusCode}, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use common::{json_body, sign};
use shopit::notify::LogMailer;
use shopit::payments::provider::{CreatedSession, Expandable, PaymentProvider};
use shopit::payments::{CheckoutRequest, CheckoutSession, ProviderError};
use shopit::{api, events::EventBus, AppState};

/// Hands back whatever sessions a test registered, as the provider would after payment.
#[derive(Default)]
struct RecordedProvider {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
}

impl RecordedProvider {
    fn paid(&self, order_id: i64, amount_minor: i64) -> String {
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        let session = CheckoutSession {
            id: id.clone(),
            payment_status: "paid".into(),
            amount_total: Some(amount_minor),
            currency: Some("gbp".into()),
            created: chrono::Utc::now().timestamp(),
            metadata: HashMap::from([("order_id".to_string(), order_id.to_string())]),
            payment_intent: Some(Expandable::Id(format!("pi_{}", Uuid::new_v4().simple()))),
        };
        self.sessions.lock().unwrap().insert(id.clone(), session);
        id
    }
}

#[async_trait]
impl PaymentProvider for RecordedProvider {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CreatedSession, ProviderError> {
        Ok(CreatedSession { id: format!("cs_created_{}", req.order_id), url: Some("https://checkout.test/pay".into()) })
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ProviderError> {
        self.sessions.lock().unwrap().get(id).cloned()
            .ok_or_else(|| ProviderError::Api { status: 404, message: format!("no such session {id}") })
    }
}

struct Shop {
    app: Router,
    state: AppState,
    pool: PgPool,
    provider: Arc<RecordedProvider>,
}

async fn shop() -> Option<Shop> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("Failed to connect to database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("Failed to run migrations");

    let provider = Arc::new(RecordedProvider::default());
    let state = AppState::new(
        pool.clone(),
        common::config(&url),
        provider.clone(),
        Arc::new(LogMailer::new("noreply@eeki.shop")),
        EventBus::disabled(),
    );
    Some(Shop { app: api::router(state.clone()), state, pool, provider })
}

impl Shop {
    async fn user(&self, superuser: bool) -> (i64, String) {
        let email = format!("{}@shopit.test", Uuid::new_v4().simple());
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash, first_name, last_name, is_superuser) VALUES ($1, 'unused', 'Test', 'Buyer', $2) RETURNING id",
        )
        .bind(&email).bind(superuser).fetch_one(&self.pool).await.unwrap();
        (id, self.state.tokens.issue(id).unwrap().access)
    }

    async fn product(&self, price: Decimal) -> i64 {
        let slug = format!("test-{}", Uuid::new_v4().simple());
        let (category,): (i64,) = sqlx::query_as("INSERT INTO categories (slug, title) VALUES ($1, 'Test') RETURNING id")
            .bind(&slug).fetch_one(&self.pool).await.unwrap();
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO products (title, description, image, rating, price, category_id) \
             VALUES ('Lamp', 'A lamp', 'https://img.test/lamp.png', 4.5, $1, $2) RETURNING id",
        )
        .bind(price).bind(category).fetch_one(&self.pool).await.unwrap();
        id
    }

    async fn call(&self, method: Method, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri).header("authorization", format!("JWT {token}"));
        let req = match body {
            Some(body) => req.header("content-type", "application/json").body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        };
        let resp = self.app.clone().oneshot(req.unwrap()).await.unwrap();
        let status = resp.status();
        (status, json_body(resp).await)
    }

    /// Opens a cart, fills it and checks out. Returns (cart id, order body).
    async fn place_order(&self, token: &str, product_id: i64, quantity: i32) -> (String, Value) {
        let (_, cart) = self.call(Method::POST, "/api/cart", token, None).await;
        let cart_id = cart["id"].as_str().unwrap().to_string();
        let (status, _) = self
            .call(Method::POST, &format!("/api/cart/{cart_id}/items"), token, Some(json!({ "product_id": product_id, "quantity": quantity })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, order) = self.call(Method::POST, "/api/orders", token, Some(json!({ "shipping_address": "1 High St" }))).await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        (cart_id, order)
    }

    async fn count(&self, sql: &str, id: impl ToString) -> i64 {
        let (n,): (i64,) = sqlx::query_as(sql).bind(id.to_string()).fetch_one(&self.pool).await.unwrap();
        n
    }
}

fn decimal(v: &Value) -> Decimal {
    v.as_str().expect("decimal as string").parse().unwrap()
}

#[tokio::test]
#[serial_test::serial]
async fn test_checkout_snapshots_prices_and_completes_cart() {
    let Some(shop) = shop().await else { return };
    let (user_id, token) = shop.user(false).await;
    let product_id = shop.product(Decimal::new(1000, 2)).await;

    let (cart_id, order) = shop.place_order(&token, product_id, 2).await;
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(decimal(&order["total_cost"]), Decimal::new(2000, 2));
    assert_eq!(order["status"], "pending");

    sqlx::query("UPDATE products SET price = 99 WHERE id = $1").bind(product_id).execute(&shop.pool).await.unwrap();
    let (status, order) = shop.call(Method::GET, &format!("/api/orders/{order_id}"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&order["products"][0]["price"]), Decimal::new(1000, 2));
    assert_eq!(decimal(&order["total_cost"]), Decimal::new(2000, 2));

    assert_eq!(shop.count("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1::uuid", &cart_id).await, 0);
    assert_eq!(shop.count("SELECT COUNT(*) FROM carts WHERE id = $1::uuid AND completed", &cart_id).await, 1);

    let (status, body) = shop.call(Method::POST, "/api/orders", &token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "no items in cart");

    let (status, cart) = shop.call(Method::POST, "/api/cart", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["id"], cart_id.as_str());
    assert_eq!(shop.count("SELECT COUNT(*) FROM carts WHERE user_id = $1::bigint AND NOT completed", user_id).await, 1);
}

#[tokio::test]
#[serial_test::serial]
async fn test_placed_orders_survive_cart_and_product_deletes() {
    let Some(shop) = shop().await else { return };
    let (_, token) = shop.user(false).await;
    let (_, admin) = shop.user(true).await;
    let lamp = shop.product(Decimal::new(1000, 2)).await;
    let (cart_id, order) = shop.place_order(&token, lamp, 2).await;
    let order_id = order["id"].as_i64().unwrap();

    shop.call(Method::POST, "/api/cart", &token, None).await;
    let (status, _) = shop.call(Method::DELETE, &format!("/api/cart/{cart_id}"), &token, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(shop.count("SELECT COUNT(*) FROM orders WHERE id = $1::bigint", order_id).await, 1);

    let (status, body) = shop.call(Method::DELETE, &format!("/api/products/{lamp}"), &admin, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Cannot delete a product that has been ordered.");

    let (_, order) = shop.call(Method::GET, &format!("/api/orders/{order_id}"), &token, None).await;
    let lines: Decimal = order["products"].as_array().unwrap().iter()
        .map(|l| decimal(&l["price"]) * Decimal::from(l["quantity"].as_i64().unwrap()))
        .sum();
    assert_eq!(lines, decimal(&order["total_cost"]));

    let (_, spare) = shop.user(false).await;
    let (status, fresh) = shop.call(Method::POST, "/api/cart", &spare, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let fresh_id = fresh["id"].as_str().unwrap();
    let (status, _) = shop.call(Method::DELETE, &format!("/api/cart/{fresh_id}"), &spare, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[serial_test::serial]
async fn test_large_order_total_is_stored() {
    let Some(shop) = shop().await else { return };
    let (_, token) = shop.user(false).await;
    let piano = shop.product(Decimal::new(99_999_900, 2)).await;

    let (_, order) = shop.place_order(&token, piano, 2).await;
    assert_eq!(decimal(&order["total_cost"]), Decimal::new(199_999_800, 2));
}

#[tokio::test]
#[serial_test::serial]
async fn test_paid_webhook_records_one_payment() {
    let Some(shop) = shop().await else { return };
    let (_, token) = shop.user(false).await;
    let rug = shop.product(Decimal::new(2500, 2)).await;
    let (_, order) = shop.place_order(&token, rug, 1).await;
    let order_id = order["id"].as_i64().unwrap();

    let (status, session) = shop.call(Method::POST, &format!("/api/payment/order/{order_id}"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["session_id"], format!("cs_created_{order_id}"));

    let session_id = shop.provider.paid(order_id, 2500);
    let payload = json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id } },
    })
    .to_string();
    for _ in 0..2 {
        let req = Request::post("/api/stripe-webhook")
            .header("stripe-signature", sign(&payload, chrono::Utc::now().timestamp()))
            .body(Body::from(payload.clone()))
            .unwrap();
        let resp = shop.app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["received"], true);
    }

    let (_, order) = shop.call(Method::GET, &format!("/api/orders/{order_id}"), &token, None).await;
    assert_eq!(order["status"], "paid");
    assert_eq!(shop.count("SELECT COUNT(*) FROM payments WHERE order_id = $1::bigint", order_id).await, 1);

    let (status, payments) = shop.call(Method::GET, "/api/payments", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let payments = payments.as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(decimal(&payments[0]["amount_paid"]), Decimal::new(2500, 2));
    assert_eq!(payments[0]["session_id"], session_id.as_str());

    let (status, body) = shop.call(Method::POST, &format!("/api/payment/order/{order_id}"), &token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Order has already been paid for.");
}
