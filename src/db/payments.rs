use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: i64,
    #[serde(rename = "order")]
    pub order_id: i64,
    pub payment_method: String,
    #[serde(rename = "paymentintent_id")]
    pub payment_intent_id: Option<String>,
    pub session_id: Option<String>,
    pub amount_paid: Decimal,
    pub payment_date: DateTime<Utc>,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub user_id: i64,
    pub order_id: i64,
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
    pub session_id: String,
    pub amount_paid: Decimal,
    pub payment_date: DateTime<Utc>,
    pub receipt_url: Option<String>,
}

pub async fn insert(db: impl PgExecutor<'_>, p: &NewPayment) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (id, user_id, order_id, payment_method, payment_intent_id, session_id, amount_paid, payment_date, receipt_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(p.user_id).bind(p.order_id).bind(&p.payment_method).bind(&p.payment_intent_id)
    .bind(&p.session_id).bind(p.amount_paid).bind(p.payment_date).bind(&p.receipt_url)
    .fetch_one(db).await
}

pub async fn exists_for_order(db: impl PgExecutor<'_>, order_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND user_id = $2)")
        .bind(order_id).bind(user_id).fetch_one(db).await?;
    Ok(row.0)
}

pub async fn list(db: impl PgExecutor<'_>, user_id: Option<i64>) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE ($1::bigint IS NULL OR user_id = $1) ORDER BY payment_date DESC")
        .bind(user_id).fetch_all(db).await
}
