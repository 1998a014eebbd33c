//! Accounts and access control: argon2 password hashes, HS256 access tokens
//! with revocation, and the per-request [`Principal`].

pub mod password;
pub mod principal;
pub mod token;

pub use principal::{Group, Principal};
pub use token::{Claims, IssuedToken, TokenService};

use rand::{distributions::Alphanumeric, Rng};

/// Random URL-safe token for email confirmation links.
pub fn confirmation_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(40).map(char::from).collect()
}

/// Lowercases the domain part of an address, leaving the local part intact.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Prunes expired token revocations once a day.
pub fn spawn_revocation_pruner(db: sqlx::PgPool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            tick.tick().await;
            match crate::db::users::prune_revoked(&db).await {
                Ok(0) => tracing::info!("no expired revoked tokens found"),
                Ok(n) => tracing::info!(removed = n, "removed expired revoked tokens"),
                Err(e) => tracing::warn!(error = %e, "pruning revoked tokens failed"),
            }
        }
    })
}
