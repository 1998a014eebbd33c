//! HTTP routes.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod groups;
pub mod index;
pub mod orders;
pub mod payments;
pub mod reviews;

use axum::{http::HeaderValue, routing::{get, post}, Router};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(index::index))
        .route("/health", get(index::health))
        // accounts
        .route("/auth/users", post(auth::register))
        .route("/auth/users/me", get(auth::me))
        .route("/auth/jwt/create", post(auth::create_token))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/api/confirm-email/:user_id/:token", get(auth::confirm_email))
        // catalog
        .route("/api/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/api/categories/:id", get(catalog::get_category).put(catalog::update_category).delete(catalog::delete_category))
        .route("/api/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/api/products/:product_id",
            get(catalog::get_product).put(catalog::replace_product).patch(catalog::patch_product).delete(catalog::delete_product),
        )
        .route("/api/products/:product_id/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route(
            "/api/products/:product_id/reviews/:review_id",
            get(reviews::get_review).put(reviews::replace_review).patch(reviews::patch_review).delete(reviews::delete_review),
        )
        // cart
        .route("/api/cart", get(cart::list_carts).post(cart::get_or_create_cart))
        .route("/api/cart/:cart_id", get(cart::get_cart).delete(cart::delete_cart))
        .route("/api/cart/:cart_id/items", get(cart::list_items).post(cart::add_item).delete(cart::clear_items))
        .route("/api/cart/:cart_id/items/:item_id", get(cart::get_item).patch(cart::update_item).delete(cart::remove_item))
        // orders
        .route("/api/orders", get(orders::list_orders).post(orders::place_order))
        .route("/api/orders/:id", get(orders::get_order).patch(orders::update_order))
        .route("/api/order-items", get(orders::list_order_items))
        .route("/api/order-items/:id", get(orders::get_order_item))
        // payments
        .route("/api/payment/order/:id", post(payments::create_checkout_session))
        .route("/api/stripe-webhook", post(payments::stripe_webhook))
        .route("/webhook", post(payments::stripe_webhook))
        .route("/api/payments", get(payments::list_payments))
        // staff groups
        .route("/api/groups/manager", get(groups::list_managers).post(groups::add_manager).delete(groups::remove_manager))
        .route(
            "/api/groups/delivery-crew",
            get(groups::list_delivery_crew).post(groups::add_delivery_crew).delete(groups::remove_delivery_crew),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new().allow_origin(allowed).allow_methods(Any).allow_headers(Any)
}
