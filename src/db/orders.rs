use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgExecutor};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::catalog::SimpleProduct;
use crate::domain::aggregates::{OrderDraft, OrderStatus};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub user_id: i64,
    pub cart_id: Uuid,
    pub delivery_crew_id: Option<i64>,
    pub status: String,
    pub shipping_address: String,
    pub total_cost: Decimal,
    pub date_created: DateTime<Utc>,
}

impl OrderRow {
    /// Rows only ever hold the four lifecycle values; anything else reads as pending.
    pub fn status(&self) -> OrderStatus { self.status.parse().unwrap_or_default() }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub title: String,
    pub image: String,
    pub product_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView { pub id: i64, pub product: SimpleProduct, pub quantity: i32, pub price: Decimal, pub order: i64 }

impl From<OrderItemRow> for OrderItemView {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: r.id,
            product: SimpleProduct { id: r.product_id, title: r.title, price: r.product_price, image: r.image },
            quantity: r.quantity,
            price: r.price,
            order: r.order_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: i64,
    pub user: i64,
    pub products: Vec<OrderItemView>,
    pub status: OrderStatus,
    pub date_created: DateTime<Utc>,
    pub shipping_address: String,
    pub total_cost: Decimal,
    pub delivery_crew: Option<i64>,
}

impl OrderView {
    /// `items` are the lines of this order only.
    pub fn new(order: OrderRow, items: Vec<OrderItemRow>) -> Self {
        Self {
            id: order.id,
            user: order.user_id,
            status: order.status(),
            products: items.into_iter().map(OrderItemView::from).collect(),
            date_created: order.date_created,
            shipping_address: order.shipping_address,
            total_cost: order.total_cost,
            delivery_crew: order.delivery_crew_id,
        }
    }
}

/// Which orders a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope { All, Customer(i64), DeliveryCrew(i64) }

const ITEM_SELECT: &str = "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price, p.title, p.image, p.price AS product_price \
     FROM order_items oi JOIN products p ON p.id = oi.product_id";

/// Writes the order header and its snapshotted lines.
pub async fn insert(conn: &mut PgConnection, draft: &OrderDraft) -> Result<OrderRow, sqlx::Error> {
    let order = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (user_id, cart_id, status, shipping_address, total_cost) VALUES ($1, $2, 'pending', $3, $4) RETURNING *",
    )
    .bind(draft.user_id).bind(draft.cart_id).bind(&draft.shipping_address).bind(draft.total_cost())
    .fetch_one(&mut *conn).await?;

    for line in &draft.lines {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)")
            .bind(order.id).bind(line.product_id).bind(line.quantity as i32).bind(line.unit_price)
            .execute(&mut *conn).await?;
    }
    Ok(order)
}

pub async fn find(db: impl PgExecutor<'_>, id: i64) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn list(db: impl PgExecutor<'_>, scope: OrderScope) -> Result<Vec<OrderRow>, sqlx::Error> {
    let query = match scope {
        OrderScope::All => sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY id"),
        OrderScope::Customer(user_id) => {
            sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY id").bind(user_id)
        }
        OrderScope::DeliveryCrew(crew_id) => sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE delivery_crew_id = $1 AND status IN ('pending', 'paid') ORDER BY id",
        )
        .bind(crew_id),
    };
    query.fetch_all(db).await
}

pub async fn items_for(db: impl PgExecutor<'_>, order_ids: &[i64]) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemRow>(&format!("{ITEM_SELECT} WHERE oi.order_id = ANY($1) ORDER BY oi.id"))
        .bind(order_ids).fetch_all(db).await
}

/// Splits item rows by the order they belong to.
pub fn group_by_order(items: Vec<OrderItemRow>) -> HashMap<i64, Vec<OrderItemRow>> {
    let mut grouped: HashMap<i64, Vec<OrderItemRow>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    grouped
}

/// Order items visible to a user; `None` means every item.
pub async fn list_items(db: impl PgExecutor<'_>, owner: Option<i64>) -> Result<Vec<OrderItemRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemRow>(&format!(
        "{ITEM_SELECT} JOIN orders o ON o.id = oi.order_id WHERE ($1::bigint IS NULL OR o.user_id = $1) ORDER BY oi.id"
    ))
    .bind(owner).fetch_all(db).await
}

pub async fn find_item(db: impl PgExecutor<'_>, id: i64) -> Result<Option<(OrderItemRow, i64)>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Owned { #[sqlx(flatten)] item: OrderItemRow, owner_id: i64 }
    let row = sqlx::query_as::<_, Owned>(
        "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price, p.title, p.image, p.price AS product_price, o.user_id AS owner_id \
         FROM order_items oi JOIN products p ON p.id = oi.product_id JOIN orders o ON o.id = oi.order_id WHERE oi.id = $1",
    )
    .bind(id).fetch_optional(db).await?;
    Ok(row.map(|r| (r.item, r.owner_id)))
}

pub async fn update(
    db: impl PgExecutor<'_>,
    id: i64,
    shipping_address: &str,
    status: OrderStatus,
    delivery_crew_id: Option<i64>,
) -> Result<OrderRow, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET shipping_address = $2, status = $3, delivery_crew_id = $4 WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(shipping_address).bind(status.as_str()).bind(delivery_crew_id)
    .fetch_one(db).await
}

pub async fn set_shipping_address(db: impl PgExecutor<'_>, id: i64, shipping_address: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET shipping_address = $2 WHERE id = $1").bind(id).bind(shipping_address).execute(db).await?;
    Ok(())
}

pub async fn set_status(db: impl PgExecutor<'_>, id: i64, status: OrderStatus) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = $2 WHERE id = $1").bind(id).bind(status.as_str()).execute(db).await?;
    Ok(())
}
