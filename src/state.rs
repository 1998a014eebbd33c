//! Shared application state handed to every handler.

use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::notify::Mailer;
use crate::payments::PaymentProvider;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub payments: Arc<dyn PaymentProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: AppConfig,
        payments: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn Mailer>,
        events: EventBus,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_ttl_hours);
        Self { db, config: Arc::new(config), tokens, payments, mailer, events }
    }
}
