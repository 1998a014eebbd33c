//! Shopit storefront backend
//!
//! Token-authenticated REST API for a small web/mobile storefront.
//!
//! ## Features
//! - Category and product catalog with reviews
//! - One open shopping cart per customer
//! - Checkout into price-snapshotted orders
//! - Hosted payment sessions and provider webhooks
//! - Group based staff roles (managers, delivery crew)

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use thiserror::Error;

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod events;
pub mod notify;
pub mod payments;
pub mod state;

pub use config::AppConfig;
pub use state::AppState;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found() -> Self { Self::NotFound("Not found.".to_string()) }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => serde_json::json!({ "detail": "Invalid input.", "errors": errors }),
            Self::Database(sqlx::Error::RowNotFound) => serde_json::json!({ "detail": "Not found." }),
            Self::Database(e) => {
                tracing::error!(error = %e, "database error");
                serde_json::json!({ "detail": "Internal server error." })
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                serde_json::json!({ "detail": "Internal server error." })
            }
            other => serde_json::json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ShopError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ShopError::Database(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::Provider("down".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ShopError::Forbidden("no".into()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn provider_error_message() {
        assert_eq!(ShopError::Provider("timeout".into()).to_string(), "Payment provider error: timeout");
    }
}
