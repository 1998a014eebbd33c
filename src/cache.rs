//! Product listing cache.
//!
//! Pages are cached per (page, size, search, ordering) for a fixed TTL.
//! Catalog writes do not invalidate; a stale page lives until it expires.

use cached::proc_macro::cached;
use serde::Serialize;
use sqlx::PgPool;

use crate::db::catalog::{self, Product, ProductOrdering};

/// Cache TTL in seconds (30 minutes).
pub const TTL_SECONDS: u64 = 30 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage { pub count: i64, pub results: Vec<Product> }

impl ProductPage {
    /// Number of pages for this result set; an empty catalog still has page 1.
    pub fn page_count(&self, page_size: u32) -> u32 {
        let size = i64::from(page_size.max(1));
        ((self.count + size - 1) / size).max(1) as u32
    }
}

fn page_key(page: u32, page_size: u32, search: Option<&str>, ordering: ProductOrdering) -> String {
    format!("products:{page}:{page_size}:{}:{}", search.unwrap_or(""), ordering.as_query().unwrap_or("id"))
}

/// Loads one page of the product listing, served from cache when fresh.
#[cached(
    time = 1800,
    key = "String",
    convert = r#"{ page_key(page, page_size, search.as_deref(), ordering) }"#,
    result = true
)]
pub async fn load_product_page(
    pool: PgPool,
    page: u32,
    page_size: u32,
    search: Option<String>,
    ordering: ProductOrdering,
) -> Result<ProductPage, String> {
    tracing::debug!(page, ?search, ?ordering, "[cache] loading product page from database");
    let size = i64::from(page_size.max(1));
    let offset = i64::from(page.saturating_sub(1)) * size;
    let count = catalog::count_products(&pool, search.as_deref())
        .await
        .map_err(|e| format!("Failed to count products: {}", e))?;
    let results = catalog::list_products(&pool, search.as_deref(), ordering, size, offset)
        .await
        .map_err(|e| format!("Failed to load products: {}", e))?;
    Ok(ProductPage { count, results })
}
