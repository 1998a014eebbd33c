use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category { pub id: i64, pub slug: String, pub title: String }

/// Product joined with its category, as the catalog serves it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub featured: bool,
    pub image: String,
    pub rating: Decimal,
    pub price: Decimal,
    pub discount: bool,
    pub inventory: i32,
    pub category_id: i64,
    pub category_slug: String,
    pub category_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub featured: bool,
    pub image: String,
    pub rating: Decimal,
    pub price: Decimal,
    pub discount: bool,
    pub inventory: i32,
    pub category: Category,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id, title: r.title, description: r.description, featured: r.featured, image: r.image,
            rating: r.rating, price: r.price, discount: r.discount, inventory: r.inventory,
            category: Category { id: r.category_id, slug: r.category_slug, title: r.category_title },
        }
    }
}

/// Compact product shape embedded in cart and order lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SimpleProduct { pub id: i64, pub title: String, pub price: Decimal, pub image: String }

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub title: String,
    pub description: String,
    pub featured: bool,
    pub image: String,
    pub rating: Decimal,
    pub price: Decimal,
    pub category_id: i64,
    pub discount: bool,
    pub inventory: i32,
}

/// Whitelisted `?ordering=` values for the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductOrdering { #[default] Id, Price, PriceDesc, Category, CategoryDesc }

impl ProductOrdering {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price") => Self::Price,
            Some("-price") => Self::PriceDesc,
            Some("category") => Self::Category,
            Some("-category") => Self::CategoryDesc,
            _ => Self::Id,
        }
    }

    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            Self::Id => None,
            Self::Price => Some("price"),
            Self::PriceDesc => Some("-price"),
            Self::Category => Some("category"),
            Self::CategoryDesc => Some("-category"),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Self::Id => "p.id",
            Self::Price => "p.price, p.id",
            Self::PriceDesc => "p.price DESC, p.id",
            Self::Category => "p.category_id, p.id",
            Self::CategoryDesc => "p.category_id DESC, p.id",
        }
    }
}

const PRODUCT_SELECT: &str = "SELECT p.id, p.title, p.description, p.featured, p.image, p.rating, p.price, p.discount, p.inventory, \
     p.category_id, c.slug AS category_slug, c.title AS category_title \
     FROM products p JOIN categories c ON c.id = p.category_id";

const SEARCH_FILTER: &str = "($1::text IS NULL OR p.title ILIKE $1 OR c.title ILIKE $1)";

fn search_pattern(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|s| !s.is_empty()).map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(db: impl PgExecutor<'_>) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id").fetch_all(db).await
}

pub async fn find_category(db: impl PgExecutor<'_>, id: i64) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn insert_category(db: impl PgExecutor<'_>, slug: &str, title: &str) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (slug, title) VALUES ($1, $2) RETURNING *")
        .bind(slug).bind(title).fetch_one(db).await
}

pub async fn update_category(db: impl PgExecutor<'_>, id: i64, slug: &str, title: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("UPDATE categories SET slug = $2, title = $3 WHERE id = $1 RETURNING *")
        .bind(id).bind(slug).bind(title).fetch_optional(db).await
}

pub async fn delete_category(db: impl PgExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(db).await?;
    Ok(res.rows_affected() == 1)
}

// =============================================================================
// Products
// =============================================================================

pub async fn count_products(db: impl PgExecutor<'_>, search: Option<&str>) -> Result<i64, sqlx::Error> {
    let total: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id WHERE {SEARCH_FILTER}"
    ))
    .bind(search_pattern(search)).fetch_one(db).await?;
    Ok(total.0)
}

pub async fn list_products(
    db: impl PgExecutor<'_>,
    search: Option<&str>,
    ordering: ProductOrdering,
    limit: i64,
    offset: i64,
) -> Result<Vec<Product>, sqlx::Error> {
    let sql = format!("{PRODUCT_SELECT} WHERE {SEARCH_FILTER} ORDER BY {} LIMIT $2 OFFSET $3", ordering.sql());
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(search_pattern(search)).bind(limit).bind(offset)
        .fetch_all(db).await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

pub async fn find_product(db: impl PgExecutor<'_>, id: i64) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id).fetch_optional(db).await?;
    Ok(row.map(Product::from))
}

pub async fn insert_product(db: impl PgExecutor<'_>, p: &ProductInput) -> Result<i64, sqlx::Error> {
    let id: (i64,) = sqlx::query_as(
        "INSERT INTO products (title, description, featured, image, rating, price, category_id, discount, inventory) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(&p.title).bind(&p.description).bind(p.featured).bind(&p.image).bind(p.rating).bind(p.price)
    .bind(p.category_id).bind(p.discount).bind(p.inventory)
    .fetch_one(db).await?;
    Ok(id.0)
}

pub async fn update_product(db: impl PgExecutor<'_>, id: i64, p: &ProductInput) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE products SET title = $2, description = $3, featured = $4, image = $5, rating = $6, price = $7, \
         category_id = $8, discount = $9, inventory = $10 WHERE id = $1",
    )
    .bind(id).bind(&p.title).bind(&p.description).bind(p.featured).bind(&p.image).bind(p.rating).bind(p.price)
    .bind(p.category_id).bind(p.discount).bind(p.inventory)
    .execute(db).await?;
    Ok(res.rows_affected() == 1)
}

pub async fn delete_product(db: impl PgExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(db).await?;
    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_whitelist() {
        assert_eq!(ProductOrdering::parse(Some("-price")), ProductOrdering::PriceDesc);
        assert_eq!(ProductOrdering::parse(Some("category")), ProductOrdering::Category);
        assert_eq!(ProductOrdering::parse(Some("price; DROP TABLE products")), ProductOrdering::Id);
        assert_eq!(ProductOrdering::parse(None).as_query(), None);
    }

    #[test]
    fn search_escapes_wildcards() {
        assert_eq!(search_pattern(Some(" lamp ")).as_deref(), Some("%lamp%"));
        assert_eq!(search_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(search_pattern(Some("   ")), None);
    }
}
