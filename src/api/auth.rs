use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{self, password, Principal};
use crate::db::{self, users::{self, NewUser, PublicUser, UserRow}};
use crate::notify::{self, templates};
use crate::{AppState, Result, ShopError};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 30))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(max = 30))]
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Credentials { pub email: String, pub password: String }

#[derive(Debug, Serialize)]
pub struct TokenResponse { pub access: String }

pub async fn register(State(s): State<AppState>, Json(r): Json<RegisterRequest>) -> Result<(StatusCode, Json<PublicUser>)> {
    r.validate()?;
    let email = auth::normalize_email(&r.email);
    let hash = password::hash_password(&r.password)?;
    let token = auth::confirmation_token();

    let user = users::insert(&s.db, NewUser {
        email: &email,
        password_hash: &hash,
        first_name: r.first_name.trim(),
        last_name: r.last_name.trim(),
        confirmation_token: &token,
    })
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) { ShopError::Conflict("A user with that email already exists.".into()) } else { e.into() }
    })?;
    tracing::info!(user_id = user.id, "user registered");

    let link = templates::confirmation_link(&s.config.frontend_url, user.id, &token);
    notify::send_detached(s.mailer.clone(), templates::welcome(&user.email, &user.last_name, &link));

    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

async fn authenticate(s: &AppState, c: &Credentials) -> Result<UserRow> {
    let invalid = || ShopError::Unauthorized("Invalid credentials".into());
    let user = users::find_by_email(&s.db, c.email.trim()).await?.filter(|u| u.is_active).ok_or_else(invalid)?;
    if !password::verify_password(&c.password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "failed login");
        return Err(invalid());
    }
    Ok(user)
}

pub async fn create_token(State(s): State<AppState>, Json(c): Json<Credentials>) -> Result<Json<TokenResponse>> {
    let user = authenticate(&s, &c).await?;
    let issued = s.tokens.issue(user.id)?;
    Ok(Json(TokenResponse { access: issued.access }))
}

pub async fn login(State(s): State<AppState>, Json(c): Json<Credentials>) -> Result<Json<serde_json::Value>> {
    let user = authenticate(&s, &c).await?;
    let issued = s.tokens.issue(user.id)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(serde_json::json!({ "detail": "Login successful", "user_id": user.id, "access": issued.access })))
}

pub async fn logout(State(s): State<AppState>, p: Principal) -> Result<Json<serde_json::Value>> {
    users::revoke_token(&s.db, p.token_id, p.user_id, p.token_expires_at).await?;
    tracing::info!(user_id = p.user_id, "user logged out");
    Ok(Json(serde_json::json!({ "detail": "Logout successful" })))
}

pub async fn me(State(s): State<AppState>, p: Principal) -> Result<Json<PublicUser>> {
    let user = users::find(&s.db, p.user_id).await?.ok_or_else(ShopError::not_found)?;
    Ok(Json(PublicUser::from(&user)))
}

pub async fn confirm_email(State(s): State<AppState>, Path((user_id, token)): Path<(i64, String)>) -> Result<Json<serde_json::Value>> {
    if users::confirm_email(&s.db, user_id, &token).await? {
        tracing::info!(user_id, "email confirmed");
        Ok(Json(serde_json::json!({ "status": "success", "message": "Email confirmed successfully" })))
    } else {
        Ok(Json(serde_json::json!({ "status": "error", "message": "Invalid confirmation link" })))
    }
}
