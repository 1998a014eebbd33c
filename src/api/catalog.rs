use axum::{extract::{Path, Query, State}, http::{header::HOST, HeaderMap, StatusCode, Uri}, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::Principal;
use crate::cache::{self, ProductPage};
use crate::db::{self, catalog::{self, Category, Product, ProductInput, ProductOrdering}};
use crate::domain::value_objects::Slug;
use crate::{AppState, Result, ShopError};

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub slug: Option<String>,
}

impl CategoryRequest {
    fn slug(&self) -> Result<Slug> {
        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Slug::new(raw),
            None => Slug::from_title(&self.title),
        };
        slug.map_err(|e| ShopError::BadRequest(e.to_string()))
    }
}

fn category_write_error(e: sqlx::Error) -> ShopError {
    if db::is_unique_violation(&e) { ShopError::Conflict("A category with that slug already exists.".into()) } else { e.into() }
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog::list_categories(&s.db).await?))
}

pub async fn get_category(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Category>> {
    catalog::find_category(&s.db, id).await?.map(Json).ok_or_else(ShopError::not_found)
}

pub async fn create_category(State(s): State<AppState>, p: Principal, Json(r): Json<CategoryRequest>) -> Result<(StatusCode, Json<Category>)> {
    p.require_admin()?;
    r.validate()?;
    let slug = r.slug()?;
    let category = catalog::insert_category(&s.db, slug.as_str(), r.title.trim()).await.map_err(category_write_error)?;
    tracing::info!(category_id = category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(State(s): State<AppState>, p: Principal, Path(id): Path<i64>, Json(r): Json<CategoryRequest>) -> Result<Json<Category>> {
    p.require_admin()?;
    r.validate()?;
    let slug = r.slug()?;
    catalog::update_category(&s.db, id, slug.as_str(), r.title.trim()).await
        .map_err(category_write_error)?
        .map(Json)
        .ok_or_else(ShopError::not_found)
}

pub async fn delete_category(State(s): State<AppState>, p: Principal, Path(id): Path<i64>) -> Result<StatusCode> {
    p.require_admin()?;
    let deleted = catalog::delete_category(&s.db, id).await.map_err(|e| {
        if db::is_foreign_key_violation(&e) { ShopError::Conflict("Cannot delete a category that still has products.".into()) } else { e.into() }
    })?;
    if !deleted { return Err(ShopError::not_found()); }
    tracing::info!(category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

fn validate_rating(rating: &Decimal) -> std::result::Result<(), ValidationError> {
    if *rating >= Decimal::new(5, 1) && *rating <= Decimal::from(5) { Ok(()) } else { Err(ValidationError::new("rating_out_of_range")) }
}

fn validate_price(price: &Decimal) -> std::result::Result<(), ValidationError> {
    if *price >= Decimal::ZERO && *price < Decimal::from(1_000_000) { Ok(()) } else { Err(ValidationError::new("price_out_of_range")) }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub featured: bool,
    #[validate(url)]
    pub image: String,
    #[validate(custom = "validate_rating")]
    pub rating: Decimal,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub category_id: i64,
    #[serde(default)]
    pub discount: bool,
    #[validate(range(min = 0))]
    #[serde(default = "default_inventory")]
    pub inventory: i32,
}

fn default_inventory() -> i32 { 5 }

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub featured: Option<bool>,
    pub image: Option<String>,
    pub rating: Option<Decimal>,
    pub price: Option<Decimal>,
    pub category_id: Option<i64>,
    pub discount: Option<bool>,
    pub inventory: Option<i32>,
}

impl ProductPatch {
    fn apply(self, current: Product) -> ProductRequest {
        ProductRequest {
            title: self.title.unwrap_or(current.title),
            description: self.description.unwrap_or(current.description),
            featured: self.featured.unwrap_or(current.featured),
            image: self.image.unwrap_or(current.image),
            rating: self.rating.unwrap_or(current.rating),
            price: self.price.unwrap_or(current.price),
            category_id: self.category_id.unwrap_or(current.category.id),
            discount: self.discount.unwrap_or(current.discount),
            inventory: self.inventory.unwrap_or(current.inventory),
        }
    }
}

impl From<ProductRequest> for ProductInput {
    fn from(r: ProductRequest) -> Self {
        Self {
            title: r.title.trim().to_string(), description: r.description, featured: r.featured, image: r.image,
            rating: r.rating, price: r.price, category_id: r.category_id, discount: r.discount, inventory: r.inventory,
        }
    }
}

fn product_write_error(e: sqlx::Error) -> ShopError {
    if db::is_foreign_key_violation(&e) { ShopError::BadRequest("Invalid category.".into()) } else { e.into() }
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery { pub page: Option<String>, pub search: Option<String>, pub ordering: Option<String> }

#[derive(Debug, Serialize)]
pub struct PaginatedProducts {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Product>,
}

/// The `page` query parameter: a 1-based page number or `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRequest { Number(u32), Last }

fn parse_page(raw: Option<&str>) -> Result<PageRequest> {
    match raw.map(str::trim) {
        None | Some("") => Ok(PageRequest::Number(1)),
        Some("last") => Ok(PageRequest::Last),
        Some(v) => v.parse::<u32>().ok().filter(|p| *p >= 1).map(PageRequest::Number)
            .ok_or_else(|| ShopError::NotFound("Invalid page.".into())),
    }
}

/// Absolute URL of the listing at `page`, keeping the other query parameters.
fn page_link(base: &str, page: u32, search: Option<&str>, ordering: ProductOrdering) -> Option<String> {
    let mut url = reqwest::Url::parse(base).ok()?;
    {
        let mut q = url.query_pairs_mut();
        q.clear();
        if let Some(o) = ordering.as_query() { q.append_pair("ordering", o); }
        if page > 1 { q.append_pair("page", &page.to_string()); }
        if let Some(s) = search { q.append_pair("search", s); }
    }
    if url.query() == Some("") { url.set_query(None); }
    Some(url.into())
}

fn request_base(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers.get(HOST).and_then(|h| h.to_str().ok()).unwrap_or("localhost");
    let scheme = headers.get("x-forwarded-proto").and_then(|h| h.to_str().ok()).unwrap_or("http");
    format!("{scheme}://{host}{}", uri.path())
}

fn paginate(page: ProductPage, number: u32, size: u32, base: &str, search: Option<&str>, ordering: ProductOrdering) -> Result<PaginatedProducts> {
    let pages = page.page_count(size);
    if number > pages { return Err(ShopError::NotFound("Invalid page.".into())); }
    Ok(PaginatedProducts {
        count: page.count,
        next: if number < pages { page_link(base, number + 1, search, ordering) } else { None },
        previous: if number > 1 { page_link(base, number - 1, search, ordering) } else { None },
        results: page.results,
    })
}

pub async fn list_products(
    State(s): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(q): Query<ProductQuery>,
) -> Result<Json<PaginatedProducts>> {
    let size = s.config.product_page_size.max(1);
    let search = q.search.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from);
    let ordering = ProductOrdering::parse(q.ordering.as_deref());
    let number = match parse_page(q.page.as_deref())? {
        PageRequest::Number(n) => n,
        PageRequest::Last => {
            let first = cache::load_product_page(s.db.clone(), 1, size, search.clone(), ordering).await.map_err(ShopError::Internal)?;
            first.page_count(size)
        }
    };
    let page = cache::load_product_page(s.db.clone(), number, size, search.clone(), ordering).await.map_err(ShopError::Internal)?;
    let base = request_base(&headers, &uri);
    Ok(Json(paginate(page, number, size, &base, search.as_deref(), ordering)?))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Product>> {
    catalog::find_product(&s.db, id).await?.map(Json).ok_or_else(ShopError::not_found)
}

pub async fn create_product(State(s): State<AppState>, p: Principal, Json(r): Json<ProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    p.require_admin()?;
    r.validate()?;
    let id = catalog::insert_product(&s.db, &r.into()).await.map_err(product_write_error)?;
    tracing::info!(product_id = id, "product created");
    let product = catalog::find_product(&s.db, id).await?.ok_or_else(ShopError::not_found)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn save_product(s: &AppState, id: i64, r: ProductRequest) -> Result<Json<Product>> {
    r.validate()?;
    if !catalog::update_product(&s.db, id, &r.into()).await.map_err(product_write_error)? {
        return Err(ShopError::not_found());
    }
    catalog::find_product(&s.db, id).await?.map(Json).ok_or_else(ShopError::not_found)
}

pub async fn replace_product(State(s): State<AppState>, p: Principal, Path(id): Path<i64>, Json(r): Json<ProductRequest>) -> Result<Json<Product>> {
    p.require_admin()?;
    save_product(&s, id, r).await
}

pub async fn patch_product(State(s): State<AppState>, p: Principal, Path(id): Path<i64>, Json(patch): Json<ProductPatch>) -> Result<Json<Product>> {
    p.require_admin()?;
    let current = catalog::find_product(&s.db, id).await?.ok_or_else(ShopError::not_found)?;
    save_product(&s, id, patch.apply(current)).await
}

pub async fn delete_product(State(s): State<AppState>, p: Principal, Path(id): Path<i64>) -> Result<StatusCode> {
    p.require_admin()?;
    let deleted = catalog::delete_product(&s.db, id).await.map_err(|e| {
        if db::is_foreign_key_violation(&e) { ShopError::Conflict("Cannot delete a product that has been ordered.".into()) } else { e.into() }
    })?;
    if !deleted { return Err(ShopError::not_found()); }
    tracing::info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
