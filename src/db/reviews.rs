use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    #[serde(rename = "product")]
    pub product_id: i64,
    pub name: String,
    pub description: String,
    pub date_created: DateTime<Utc>,
}

pub async fn list_for_product(db: impl PgExecutor<'_>, product_id: i64) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE product_id = $1 ORDER BY id")
        .bind(product_id).fetch_all(db).await
}

pub async fn find(db: impl PgExecutor<'_>, product_id: i64, id: i64) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 AND product_id = $2")
        .bind(id).bind(product_id).fetch_optional(db).await
}

pub async fn insert(db: impl PgExecutor<'_>, user_id: i64, product_id: i64, name: &str, description: &str) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>("INSERT INTO reviews (user_id, product_id, name, description) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(user_id).bind(product_id).bind(name).bind(description).fetch_one(db).await
}

pub async fn update(db: impl PgExecutor<'_>, id: i64, name: &str, description: &str) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>("UPDATE reviews SET name = $2, description = $3 WHERE id = $1 RETURNING *")
        .bind(id).bind(name).bind(description).fetch_one(db).await
}

pub async fn delete(db: impl PgExecutor<'_>, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(db).await?;
    Ok(())
}
