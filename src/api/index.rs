use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Endpoint { pub name: &'static str, pub url: &'static str }

const ENDPOINTS: &[Endpoint] = &[
    Endpoint { name: "register", url: "/auth/users" },
    Endpoint { name: "token", url: "/auth/jwt/create" },
    Endpoint { name: "login", url: "/auth/login" },
    Endpoint { name: "logout", url: "/auth/logout" },
    Endpoint { name: "me", url: "/auth/users/me" },
    Endpoint { name: "categories", url: "/api/categories" },
    Endpoint { name: "products", url: "/api/products" },
    Endpoint { name: "cart", url: "/api/cart" },
    Endpoint { name: "orders", url: "/api/orders" },
    Endpoint { name: "order-items", url: "/api/order-items" },
    Endpoint { name: "payments", url: "/api/payments" },
    Endpoint { name: "managers", url: "/api/groups/manager" },
    Endpoint { name: "delivery-crew", url: "/api/groups/delivery-crew" },
];

pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "endpoints": ENDPOINTS }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "shopit"}))
}
