use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;

use crate::auth::{principal::forbidden, Group, Principal};
use crate::db::{carts, orders::{self, OrderItemView, OrderRow, OrderView}, users};
use crate::domain::aggregates::{OrderDraft, OrderError, OrderStatus};
use crate::domain::events::DomainEvent;
use crate::{AppState, Result, ShopError};

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest { pub shipping_address: Option<String>, pub user_id: Option<i64> }

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub shipping_address: Option<String>,
    pub status: Option<OrderStatus>,
    pub delivery_crew_id: Option<i64>,
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self { ShopError::BadRequest(e.to_string()) }
}

fn order_forbidden() -> ShopError {
    ShopError::Forbidden("You do not have permission to access this order.".into())
}

/// The role a caller plays for one particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderRole { Manager, Owner, AssignedCrew }

fn role_for(p: &Principal, order: &OrderRow) -> Option<OrderRole> {
    if p.is_admin() || p.is_manager() {
        Some(OrderRole::Manager)
    } else if order.user_id == p.user_id {
        Some(OrderRole::Owner)
    } else if p.is_delivery_crew() && order.delivery_crew_id == Some(p.user_id) {
        Some(OrderRole::AssignedCrew)
    } else {
        None
    }
}

/// Checks an update against what the caller's role allows, returning the next status.
fn authorize_update(role: OrderRole, current: OrderStatus, r: &UpdateOrderRequest) -> Result<OrderStatus> {
    if r.delivery_crew_id.is_some() && role != OrderRole::Manager {
        return Err(forbidden());
    }
    if r.shipping_address.is_some() && role == OrderRole::AssignedCrew {
        return Err(forbidden());
    }
    let Some(next) = r.status.filter(|s| *s != current) else { return Ok(current) };
    match role {
        OrderRole::Manager => {}
        OrderRole::AssignedCrew if next == OrderStatus::Delivered => {}
        _ => return Err(forbidden()),
    }
    Ok(current.transition(next)?)
}

async fn order_view(s: &AppState, order: OrderRow) -> Result<OrderView> {
    let items = orders::items_for(&s.db, &[order.id]).await?;
    Ok(OrderView::new(order, items))
}

pub async fn place_order(State(s): State<AppState>, p: Principal, body: Option<Json<PlaceOrderRequest>>) -> Result<(StatusCode, Json<OrderView>)> {
    let r = body.map(|Json(r)| r).unwrap_or_default();
    let user_id = match r.user_id {
        Some(id) if id != p.user_id => {
            p.require_admin()?;
            id
        }
        _ => p.user_id,
    };

    let mut tx = s.db.begin().await?;
    let cart = carts::lock_open_for_user(&mut *tx, user_id).await?.ok_or(OrderError::NoItems)?;
    let items = carts::items(&mut *tx, cart.id).await?;
    let draft = OrderDraft::from_cart(&cart.to_cart(&items, &s.config.checkout_currency), r.shipping_address.unwrap_or_default().trim())?;
    let order = orders::insert(&mut *tx, &draft).await?;
    carts::clear(&mut *tx, cart.id).await?;
    carts::set_completed(&mut *tx, cart.id, true).await?;
    tx.commit().await?;

    tracing::info!(order_id = order.id, user_id, total_cost = %order.total_cost, lines = draft.lines.len(), "order placed");
    s.events.publish(DomainEvent::OrderPlaced { order_id: order.id, user_id, total_cost: order.total_cost }).await;
    Ok((StatusCode::CREATED, Json(order_view(&s, order).await?)))
}

pub async fn list_orders(State(s): State<AppState>, p: Principal) -> Result<Json<Vec<OrderView>>> {
    let rows = orders::list(&s.db, p.order_scope()).await?;
    let ids: Vec<i64> = rows.iter().map(|o| o.id).collect();
    let mut items = orders::group_by_order(orders::items_for(&s.db, &ids).await?);
    Ok(Json(rows.into_iter().map(|o| {
        let lines = items.remove(&o.id).unwrap_or_default();
        OrderView::new(o, lines)
    }).collect()))
}

pub async fn get_order(State(s): State<AppState>, p: Principal, Path(id): Path<i64>) -> Result<Json<OrderView>> {
    let order = orders::find(&s.db, id).await?.ok_or_else(ShopError::not_found)?;
    if role_for(&p, &order).is_none() { return Err(order_forbidden()); }
    Ok(Json(order_view(&s, order).await?))
}

pub async fn update_order(
    State(s): State<AppState>,
    p: Principal,
    Path(id): Path<i64>,
    Json(r): Json<UpdateOrderRequest>,
) -> Result<Json<OrderView>> {
    let order = orders::find(&s.db, id).await?.ok_or_else(ShopError::not_found)?;
    let role = role_for(&p, &order).ok_or_else(order_forbidden)?;
    let current = order.status();
    let next = authorize_update(role, current, &r)?;

    if let Some(crew_id) = r.delivery_crew_id {
        if !users::groups_of(&s.db, crew_id).await?.contains(&Group::DeliveryCrew) {
            return Err(ShopError::BadRequest("User is not a member of the delivery crew.".into()));
        }
    }
    let address = r.shipping_address.as_deref().map(str::trim).unwrap_or(&order.shipping_address);
    let crew = r.delivery_crew_id.or(order.delivery_crew_id);
    let updated = orders::update(&s.db, id, address, next, crew).await?;

    if next != current {
        tracing::info!(order_id = id, from = %current, to = %next, by = p.user_id, "order status changed");
        s.events.publish(DomainEvent::OrderStatusChanged { order_id: id, status: next.to_string() }).await;
    }
    Ok(Json(order_view(&s, updated).await?))
}

pub async fn list_order_items(State(s): State<AppState>, p: Principal) -> Result<Json<Vec<OrderItemView>>> {
    let owner = if p.is_superuser { None } else { Some(p.user_id) };
    let items = orders::list_items(&s.db, owner).await?;
    Ok(Json(items.into_iter().map(OrderItemView::from).collect()))
}

pub async fn get_order_item(State(s): State<AppState>, p: Principal, Path(id): Path<i64>) -> Result<Json<OrderItemView>> {
    let (item, owner_id) = orders::find_item(&s.db, id).await?.ok_or_else(ShopError::not_found)?;
    if !p.is_superuser && owner_id != p.user_id { return Err(order_forbidden()); }
    Ok(Json(item.into()))
}
