use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::auth::Principal;
use crate::db::{catalog, reviews::{self, Review}};
use crate::{AppState, Result, ShopError};

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewPatch { pub name: Option<String>, pub description: Option<String> }

fn not_owner() -> ShopError {
    ShopError::Forbidden("You can only modify your own reviews.".into())
}

/// Loads a review for editing; only its author may change it.
async fn owned_review(s: &AppState, p: &Principal, product_id: i64, id: i64) -> Result<Review> {
    let review = reviews::find(&s.db, product_id, id).await?.ok_or_else(ShopError::not_found)?;
    if review.user_id != p.user_id { return Err(not_owner()); }
    Ok(review)
}

pub async fn list_reviews(State(s): State<AppState>, Path(product_id): Path<i64>) -> Result<Json<Vec<Review>>> {
    Ok(Json(reviews::list_for_product(&s.db, product_id).await?))
}

pub async fn get_review(State(s): State<AppState>, Path((product_id, id)): Path<(i64, i64)>) -> Result<Json<Review>> {
    reviews::find(&s.db, product_id, id).await?.map(Json).ok_or_else(ShopError::not_found)
}

pub async fn create_review(
    State(s): State<AppState>,
    p: Principal,
    Path(product_id): Path<i64>,
    Json(r): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    r.validate()?;
    catalog::find_product(&s.db, product_id).await?.ok_or_else(ShopError::not_found)?;
    let review = reviews::insert(&s.db, p.user_id, product_id, r.name.trim(), &r.description).await?;
    tracing::info!(review_id = review.id, product_id, user_id = p.user_id, "review posted");
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn replace_review(
    State(s): State<AppState>,
    p: Principal,
    Path((product_id, id)): Path<(i64, i64)>,
    Json(r): Json<ReviewRequest>,
) -> Result<Json<Review>> {
    r.validate()?;
    owned_review(&s, &p, product_id, id).await?;
    Ok(Json(reviews::update(&s.db, id, r.name.trim(), &r.description).await?))
}

pub async fn patch_review(
    State(s): State<AppState>,
    p: Principal,
    Path((product_id, id)): Path<(i64, i64)>,
    Json(patch): Json<ReviewPatch>,
) -> Result<Json<Review>> {
    let current = owned_review(&s, &p, product_id, id).await?;
    let merged = ReviewRequest {
        name: patch.name.unwrap_or(current.name),
        description: patch.description.unwrap_or(current.description),
    };
    merged.validate()?;
    Ok(Json(reviews::update(&s.db, id, merged.name.trim(), &merged.description).await?))
}

pub async fn delete_review(State(s): State<AppState>, p: Principal, Path((product_id, id)): Path<(i64, i64)>) -> Result<StatusCode> {
    owned_review(&s, &p, product_id, id).await?;
    reviews::delete(&s.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
