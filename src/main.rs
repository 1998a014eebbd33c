//! Shopit storefront API server

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopit::notify::{BrevoMailer, LogMailer, Mailer};
use shopit::payments::StripeClient;
use shopit::{api, auth, events::EventBus, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.database_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let events = EventBus::connect(config.nats_url.as_deref()).await;
    let payments = Arc::new(StripeClient::new(&config.stripe_secret_key, &config.stripe_api_base));
    let mailer: Arc<dyn Mailer> = match &config.brevo_api_key {
        Some(key) => Arc::new(BrevoMailer::new(key, &config.email_from)),
        None => {
            tracing::warn!("BREVO_API_KEY not set, emails will only be logged");
            Arc::new(LogMailer::new(&config.email_from))
        }
    };
    auth::spawn_revocation_pruner(db.clone());

    let port = config.port;
    let state = AppState::new(db, config, payments, mailer, events);
    let app = api::router(state);

    tracing::info!("🚀 Shopit listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
