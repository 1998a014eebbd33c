use axum::{extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{principal::forbidden, Principal};
use crate::db::{self, carts::{self, CartItemView, CartRow}, catalog};
use crate::domain::aggregates::{cart::merged_quantity, CartError, Decrement};
use crate::{AppState, Result, ShopError};

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    pub cart_total: Decimal,
    pub total_quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

impl From<CartError> for ShopError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => ShopError::not_found(),
            CartError::InvalidQuantity => ShopError::BadRequest(e.to_string()),
        }
    }
}

async fn cart_view(s: &AppState, row: &CartRow) -> Result<CartView> {
    let items = carts::items(&s.db, row.id).await?;
    let cart = row.to_cart(&items, &s.config.checkout_currency);
    Ok(CartView {
        id: row.id,
        cart_total: cart.total().amount(),
        total_quantity: cart.total_quantity(),
        items: items.into_iter().map(CartItemView::from).collect(),
    })
}

/// Loads a cart the caller may touch: their own, or any cart for admins.
async fn owned_cart(s: &AppState, p: &Principal, id: Uuid) -> Result<CartRow> {
    let cart = carts::find(&s.db, id).await?.ok_or_else(ShopError::not_found)?;
    if !p.can_access(cart.user_id) { return Err(forbidden()); }
    Ok(cart)
}

/// Orders keep a reference to the cart they were placed from.
fn cart_delete_error(e: sqlx::Error) -> ShopError {
    if db::is_foreign_key_violation(&e) { ShopError::Conflict("Cannot delete a cart that has orders.".into()) } else { e.into() }
}

/// Returns the caller's cart, reopening a checked-out one, or creates a new one (201).
pub async fn get_or_create_cart(State(s): State<AppState>, p: Principal) -> Result<Response> {
    if let Some(row) = carts::latest_for_user(&s.db, p.user_id).await? {
        let mut cart = row.to_cart(&[], &s.config.checkout_currency);
        if cart.reopen() {
            carts::set_completed(&s.db, row.id, false).await?;
            tracing::info!(cart_id = %row.id, user_id = p.user_id, "cart reopened");
        }
        let row = CartRow { completed: false, ..row };
        return Ok((StatusCode::OK, Json(cart_view(&s, &row).await?)).into_response());
    }

    let row = match carts::insert(&s.db, p.user_id).await {
        Ok(row) => row,
        // a concurrent request opened one first
        Err(e) if db::is_unique_violation(&e) => {
            let row = carts::latest_for_user(&s.db, p.user_id).await?.ok_or_else(ShopError::not_found)?;
            return Ok((StatusCode::OK, Json(cart_view(&s, &row).await?)).into_response());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(cart_id = %row.id, user_id = p.user_id, "cart created");
    Ok((StatusCode::CREATED, Json(cart_view(&s, &row).await?)).into_response())
}

pub async fn list_carts(State(s): State<AppState>, p: Principal) -> Result<Json<Vec<CartView>>> {
    let owner = if p.is_admin() { None } else { Some(p.user_id) };
    let rows = carts::list(&s.db, owner).await?;
    let views = futures::future::try_join_all(rows.iter().map(|row| cart_view(&s, row))).await?;
    Ok(Json(views))
}

pub async fn get_cart(State(s): State<AppState>, p: Principal, Path(cart_id): Path<Uuid>) -> Result<Json<CartView>> {
    let cart = owned_cart(&s, &p, cart_id).await?;
    Ok(Json(cart_view(&s, &cart).await?))
}

pub async fn delete_cart(State(s): State<AppState>, p: Principal, Path(cart_id): Path<Uuid>) -> Result<StatusCode> {
    owned_cart(&s, &p, cart_id).await?;
    carts::delete(&s.db, cart_id).await.map_err(cart_delete_error)?;
    tracing::info!(%cart_id, "cart deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(State(s): State<AppState>, p: Principal, Path(cart_id): Path<Uuid>) -> Result<Json<Vec<CartItemView>>> {
    owned_cart(&s, &p, cart_id).await?;
    let items = carts::items(&s.db, cart_id).await?;
    Ok(Json(items.into_iter().map(CartItemView::from).collect()))
}

pub async fn get_item(State(s): State<AppState>, p: Principal, Path((cart_id, item_id)): Path<(Uuid, i64)>) -> Result<Json<CartItemView>> {
    owned_cart(&s, &p, cart_id).await?;
    carts::find_item(&s.db, cart_id, item_id).await?.map(|i| Json(i.into())).ok_or_else(ShopError::not_found)
}

pub async fn add_item(
    State(s): State<AppState>,
    p: Principal,
    Path(cart_id): Path<Uuid>,
    Json(r): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItemView>)> {
    r.validate()?;
    let cart = owned_cart(&s, &p, cart_id).await?;
    if cart.completed {
        return Err(ShopError::BadRequest("This cart has already been checked out.".into()));
    }
    catalog::find_product(&s.db, r.product_id).await?.ok_or_else(|| ShopError::NotFound("Product not found.".into()))?;

    let existing = carts::items(&s.db, cart_id).await?.into_iter().find(|i| i.product_id == r.product_id).map(|i| i.quantity);
    merged_quantity(existing, r.quantity)?;

    let item_id = carts::add_item(&s.db, cart_id, r.product_id, r.quantity).await?;
    let item = carts::find_item(&s.db, cart_id, item_id).await?.ok_or_else(ShopError::not_found)?;
    tracing::info!(%cart_id, product_id = r.product_id, quantity = item.quantity, "cart item added");
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn update_item(
    State(s): State<AppState>,
    p: Principal,
    Path((cart_id, item_id)): Path<(Uuid, i64)>,
    Json(r): Json<UpdateItemRequest>,
) -> Result<Json<CartItemView>> {
    r.validate()?;
    let cart = owned_cart(&s, &p, cart_id).await?;
    let items = carts::items(&s.db, cart_id).await?;
    let item = items.iter().find(|i| i.id == item_id).ok_or_else(ShopError::not_found)?;
    let mut domain = cart.to_cart(&items, &s.config.checkout_currency);
    domain.set_quantity(item.product_id, r.quantity as u32)?;

    carts::set_item_quantity(&s.db, item_id, r.quantity).await?;
    carts::find_item(&s.db, cart_id, item_id).await?.map(|i| Json(i.into())).ok_or_else(ShopError::not_found)
}

/// Takes one unit off the line; the line is removed instead of reaching zero.
pub async fn remove_item(State(s): State<AppState>, p: Principal, Path((cart_id, item_id)): Path<(Uuid, i64)>) -> Result<Response> {
    let cart = owned_cart(&s, &p, cart_id).await?;
    let items = carts::items(&s.db, cart_id).await?;
    let item = items.iter().find(|i| i.id == item_id).ok_or_else(ShopError::not_found)?;
    let mut domain = cart.to_cart(&items, &s.config.checkout_currency);

    match domain.decrement(item.product_id)? {
        Decrement::Reduced(quantity) => {
            carts::set_item_quantity(&s.db, item_id, quantity as i32).await?;
            let item = carts::find_item(&s.db, cart_id, item_id).await?.ok_or_else(ShopError::not_found)?;
            Ok(Json(CartItemView::from(item)).into_response())
        }
        Decrement::Removed => {
            carts::delete_item(&s.db, item_id).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

pub async fn clear_items(State(s): State<AppState>, p: Principal, Path(cart_id): Path<Uuid>) -> Result<StatusCode> {
    owned_cart(&s, &p, cart_id).await?;
    let removed = carts::clear(&s.db, cart_id).await?;
    tracing::info!(%cart_id, removed, "cart cleared");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_must_be_positive() {
        assert!(AddItemRequest { product_id: 1, quantity: 0 }.validate().is_err());
        assert!(AddItemRequest { product_id: 1, quantity: 2 }.validate().is_ok());
        assert!(UpdateItemRequest { quantity: -1 }.validate().is_err());
    }

    #[test]
    fn test_cart_errors_map_to_status() {
        assert_eq!(ShopError::from(CartError::ItemNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::from(CartError::InvalidQuantity).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cart_delete_error_passes_other_errors() {
        assert_eq!(cart_delete_error(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
    }
}
