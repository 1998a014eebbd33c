use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db::catalog::SimpleProduct;
use crate::domain::aggregates::{Cart, CartLine};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartRow { pub id: Uuid, pub user_id: i64, pub created_at: DateTime<Utc>, pub completed: bool }

/// Cart line joined with the product's current title, price and image.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: i64,
    pub cart_id: Uuid,
    pub product_id: i64,
    pub quantity: i32,
    pub title: String,
    pub price: Decimal,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: i64,
    pub cart: Uuid,
    pub product: SimpleProduct,
    pub quantity: i32,
    pub sub_total: Decimal,
}

impl From<CartItemRow> for CartItemView {
    fn from(r: CartItemRow) -> Self {
        Self {
            id: r.id,
            cart: r.cart_id,
            sub_total: r.price * Decimal::from(r.quantity),
            quantity: r.quantity,
            product: SimpleProduct { id: r.product_id, title: r.title, price: r.price, image: r.image },
        }
    }
}

impl CartRow {
    /// Builds the domain cart from this row and its priced lines.
    pub fn to_cart(&self, items: &[CartItemRow], currency: &str) -> Cart {
        let lines = items.iter()
            .map(|i| CartLine::new(i.product_id, i.title.clone(), i.quantity.max(0) as u32, i.price, currency))
            .collect();
        Cart::new(self.id, self.user_id, self.completed, currency).with_items(lines)
    }
}

const ITEM_SELECT: &str = "SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.title, p.price, p.image \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id";

pub async fn find(db: impl PgExecutor<'_>, id: Uuid) -> Result<Option<CartRow>, sqlx::Error> {
    sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE id = $1").bind(id).fetch_optional(db).await
}

/// The user's open cart, or else their most recent completed one.
pub async fn latest_for_user(db: impl PgExecutor<'_>, user_id: i64) -> Result<Option<CartRow>, sqlx::Error> {
    sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1 ORDER BY completed, created_at DESC LIMIT 1")
        .bind(user_id).fetch_optional(db).await
}

/// Locks the user's open cart for the rest of the transaction.
pub async fn lock_open_for_user(db: impl PgExecutor<'_>, user_id: i64) -> Result<Option<CartRow>, sqlx::Error> {
    sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1 AND NOT completed FOR UPDATE")
        .bind(user_id).fetch_optional(db).await
}

pub async fn list(db: impl PgExecutor<'_>, user_id: Option<i64>) -> Result<Vec<CartRow>, sqlx::Error> {
    sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE ($1::bigint IS NULL OR user_id = $1) ORDER BY created_at")
        .bind(user_id).fetch_all(db).await
}

pub async fn insert(db: impl PgExecutor<'_>, user_id: i64) -> Result<CartRow, sqlx::Error> {
    sqlx::query_as::<_, CartRow>("INSERT INTO carts (id, user_id) VALUES ($1, $2) RETURNING *")
        .bind(Uuid::now_v7()).bind(user_id).fetch_one(db).await
}

pub async fn set_completed(db: impl PgExecutor<'_>, id: Uuid, completed: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET completed = $2 WHERE id = $1").bind(id).bind(completed).execute(db).await?;
    Ok(())
}

pub async fn delete(db: impl PgExecutor<'_>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM carts WHERE id = $1").bind(id).execute(db).await?;
    Ok(())
}

// =============================================================================
// Cart items
// =============================================================================

pub async fn items(db: impl PgExecutor<'_>, cart_id: Uuid) -> Result<Vec<CartItemRow>, sqlx::Error> {
    sqlx::query_as::<_, CartItemRow>(&format!("{ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id"))
        .bind(cart_id).fetch_all(db).await
}

pub async fn find_item(db: impl PgExecutor<'_>, cart_id: Uuid, id: i64) -> Result<Option<CartItemRow>, sqlx::Error> {
    sqlx::query_as::<_, CartItemRow>(&format!("{ITEM_SELECT} WHERE ci.cart_id = $1 AND ci.id = $2"))
        .bind(cart_id).bind(id).fetch_optional(db).await
}

/// Adds `quantity` units of a product, merging with an existing line. Returns the line id.
pub async fn add_item(db: impl PgExecutor<'_>, cart_id: Uuid, product_id: i64, quantity: i32) -> Result<i64, sqlx::Error> {
    let id: (i64,) = sqlx::query_as(
        "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity RETURNING id",
    )
    .bind(cart_id).bind(product_id).bind(quantity).fetch_one(db).await?;
    Ok(id.0)
}

pub async fn set_item_quantity(db: impl PgExecutor<'_>, id: i64, quantity: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1").bind(id).bind(quantity).execute(db).await?;
    Ok(())
}

pub async fn delete_item(db: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(id).execute(db).await?;
    Ok(())
}

pub async fn clear(db: impl PgExecutor<'_>, cart_id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(db).await?;
    Ok(res.rows_affected())
}
