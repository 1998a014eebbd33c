//! Environment-driven configuration.

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub checkout_currency: String,
    pub frontend_url: String,
    pub email_from: String,
    pub brevo_api_key: Option<String>,
    pub nats_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub product_page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            port: parsed("PORT", 8083)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_hours: parsed("JWT_TTL_HOURS", 24)?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_base: optional("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".into()),
            checkout_currency: optional("CHECKOUT_CURRENCY").unwrap_or_else(|| "gbp".into()).to_lowercase(),
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "https://eeki.shop".into())
                .trim_end_matches('/')
                .to_string(),
            email_from: optional("EMAIL_FROM").unwrap_or_else(|| "noreply@eeki.shop".into()),
            brevo_api_key: optional("BREVO_API_KEY"),
            nats_url: optional("NATS_URL"),
            cors_origins: optional("CORS_ORIGINS").map(|v| split_list(&v)).unwrap_or_default(),
            product_page_size: parsed("PRODUCT_PAGE_SIZE", 10)?,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
