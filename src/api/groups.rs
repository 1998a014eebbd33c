//! Staff group membership: managers and delivery crew.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::auth::{Group, Principal};
use crate::db::users::{self, PublicUser, UserRow};
use crate::{AppState, Result, ShopError};

#[derive(Debug, Deserialize)]
pub struct MemberRequest { pub email: String }

type Message = (StatusCode, Json<serde_json::Value>);

fn message(status: StatusCode, text: &str) -> Message {
    (status, Json(serde_json::json!({ "message": text })))
}

async fn user_by_email(s: &AppState, email: &str) -> Result<UserRow> {
    users::find_by_email(&s.db, email.trim()).await?.ok_or_else(|| ShopError::NotFound("User not found.".into()))
}

async fn members(s: &AppState, group: Group) -> Result<Json<Vec<PublicUser>>> {
    let rows = users::members_of(&s.db, group).await?;
    Ok(Json(rows.iter().map(PublicUser::from).collect()))
}

pub async fn list_managers(State(s): State<AppState>, p: Principal) -> Result<Json<Vec<PublicUser>>> {
    p.require_admin()?;
    members(&s, Group::Manager).await
}

pub async fn add_manager(State(s): State<AppState>, p: Principal, Json(r): Json<MemberRequest>) -> Result<Message> {
    p.require_admin()?;
    let user = user_by_email(&s, &r.email).await?;
    users::add_to_group(&s.db, user.id, Group::Manager).await?;
    tracing::info!(user_id = user.id, by = p.user_id, "added to managers");
    Ok(message(StatusCode::ACCEPTED, "user added to the managers group"))
}

pub async fn remove_manager(State(s): State<AppState>, p: Principal, Json(r): Json<MemberRequest>) -> Result<Message> {
    p.require_admin()?;
    let user = user_by_email(&s, &r.email).await?;
    users::remove_from_group(&s.db, user.id, Group::Manager).await?;
    tracing::info!(user_id = user.id, by = p.user_id, "removed from managers");
    Ok(message(StatusCode::OK, "user removed from managers' group"))
}

pub async fn list_delivery_crew(State(s): State<AppState>, _p: Principal) -> Result<Json<Vec<PublicUser>>> {
    members(&s, Group::DeliveryCrew).await
}

pub async fn add_delivery_crew(State(s): State<AppState>, p: Principal, Json(r): Json<MemberRequest>) -> Result<Message> {
    if !p.is_manager() { return Ok(message(StatusCode::FORBIDDEN, "forbidden")); }
    let user = user_by_email(&s, &r.email).await?;
    users::add_to_group(&s.db, user.id, Group::DeliveryCrew).await?;
    tracing::info!(user_id = user.id, by = p.user_id, "added to delivery crew");
    Ok(message(StatusCode::ACCEPTED, "user added to the delivery crew group"))
}

pub async fn remove_delivery_crew(State(s): State<AppState>, p: Principal, Json(r): Json<MemberRequest>) -> Result<Message> {
    if !p.is_manager() { return Ok(message(StatusCode::FORBIDDEN, "forbidden")); }
    let user = user_by_email(&s, &r.email).await?;
    users::remove_from_group(&s.db, user.id, Group::DeliveryCrew).await?;
    tracing::info!(user_id = user.id, by = p.user_id, "removed from delivery crew");
    Ok(message(StatusCode::OK, "user removed from the delivery crew group"))
}
