use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::auth::Group;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub email_confirmed: bool,
    pub confirmation_token: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub email_confirmed: bool,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub phone_number: Option<String>,
}

impl From<&UserRow> for PublicUser {
    fn from(u: &UserRow) -> Self {
        Self {
            id: u.id, email: u.email.clone(), first_name: u.first_name.clone(), last_name: u.last_name.clone(),
            email_confirmed: u.email_confirmed, address: u.address.clone(), postal_code: u.postal_code.clone(),
            phone_number: u.phone_number.clone(),
        }
    }
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub confirmation_token: &'a str,
}

pub async fn insert(db: impl PgExecutor<'_>, u: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, password_hash, first_name, last_name, confirmation_token) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(u.email).bind(u.password_hash).bind(u.first_name).bind(u.last_name).bind(u.confirmation_token)
    .fetch_one(db).await
}

pub async fn find(db: impl PgExecutor<'_>, id: i64) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn find_by_email(db: impl PgExecutor<'_>, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE lower(email) = lower($1)").bind(email).fetch_optional(db).await
}

/// True when the token matched and the address is now confirmed.
pub async fn confirm_email(db: impl PgExecutor<'_>, id: i64, token: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("UPDATE users SET email_confirmed = TRUE, updated_at = NOW() WHERE id = $1 AND confirmation_token = $2")
        .bind(id).bind(token).execute(db).await?;
    Ok(res.rows_affected() == 1)
}

pub async fn groups_of(db: impl PgExecutor<'_>, user_id: i64) -> Result<Vec<Group>, sqlx::Error> {
    let names: Vec<(String,)> = sqlx::query_as("SELECT group_name FROM user_groups WHERE user_id = $1 ORDER BY group_name")
        .bind(user_id).fetch_all(db).await?;
    Ok(names.iter().filter_map(|(n,)| Group::from_db(n)).collect())
}

pub async fn members_of(db: impl PgExecutor<'_>, group: Group) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT u.* FROM users u JOIN user_groups g ON g.user_id = u.id WHERE g.group_name = $1 ORDER BY u.id",
    )
    .bind(group.db_name()).fetch_all(db).await
}

pub async fn add_to_group(db: impl PgExecutor<'_>, user_id: i64, group: Group) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(user_id).bind(group.db_name()).execute(db).await?;
    Ok(())
}

pub async fn remove_from_group(db: impl PgExecutor<'_>, user_id: i64, group: Group) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_name = $2")
        .bind(user_id).bind(group.db_name()).execute(db).await?;
    Ok(())
}

// =============================================================================
// Token revocation
// =============================================================================

pub async fn revoke_token(db: impl PgExecutor<'_>, jti: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO revoked_tokens (jti, user_id, expires_at) VALUES ($1, $2, $3) ON CONFLICT (jti) DO NOTHING")
        .bind(jti).bind(user_id).bind(expires_at).execute(db).await?;
    Ok(())
}

pub async fn is_revoked(db: impl PgExecutor<'_>, jti: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1").bind(jti).fetch_optional(db).await?;
    Ok(row.is_some())
}

/// Deletes revocations whose token has expired anyway; returns how many went.
pub async fn prune_revoked(db: impl PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()").execute(db).await?;
    Ok(res.rows_affected())
}
