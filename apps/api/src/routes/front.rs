//! # Storefront
//!
//! Anonymous, read-only and cached.
//!
//! ```text
//! GET /api/front/products?search=hvit&limit=25
//!        │
//!        ▼
//!   cache key "front:products:25:0:search=hvit"
//!        │
//!        ├── hit  ──► cached JSON
//!        └── miss ──► selector ──► store with TTL ──► JSON
//! ```
//!
//! Every back-office write that changes what customers see drops all
//! `front:` keys, so the TTL only bounds how long a discount can keep
//! showing after its window closes.

use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use aria_core::Page;
use aria_db::ProductFilter;

use crate::cache::{get_or_insert_json, FRONT_PREFIX};
use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery, Pagination};
use crate::selectors::catalogue::{front_categories, FrontCategories};
use crate::selectors::discounts::{active_discounts, FrontDiscount};
use crate::selectors::products::{
    front_product_detail, front_product_list, ProductDetail, ProductListItem,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontProductQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub color_id: Option<String>,
    pub shape_id: Option<String>,
    pub supplier_id: Option<String>,
}

fn ttl(state: &AppState) -> Duration {
    Duration::from_secs(state.config.cache_ttl_secs)
}

/// GET /api/front/products
async fn products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FrontProductQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<ProductListItem>>> {
    let key = pagination.cache_key(&format!("{FRONT_PREFIX}products"));
    let filter = ProductFilter {
        search: query.search,
        supplier_id: query.supplier_id,
        category_id: query.category_id,
        color_id: query.color_id,
        shape_id: query.shape_id,
        ..Default::default()
    };
    let db = state.db.clone();
    let base_url = state.config.base_url().to_string();

    let page = get_or_insert_json(&state.cache, &key, ttl(&state), move || async move {
        let (rows, count) =
            front_product_list(&db, filter, pagination.limit(), pagination.offset()).await?;
        Ok(pagination.page(rows, count, &base_url))
    })
    .await?;

    Ok(Json(page))
}

/// GET /api/front/products/{slug}
async fn product(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<ProductDetail>> {
    let key = format!("{FRONT_PREFIX}product:{slug}");
    let detail = get_or_insert_json(&state.cache, &key, ttl(&state), || {
        front_product_detail(&state.db, &slug)
    })
    .await?;
    Ok(Json(detail))
}

/// GET /api/front/categories
async fn categories(State(state): State<AppState>) -> ApiResult<Json<FrontCategories>> {
    let key = format!("{FRONT_PREFIX}categories");
    let categories =
        get_or_insert_json(&state.cache, &key, ttl(&state), || front_categories(&state.db)).await?;
    Ok(Json(categories))
}

/// GET /api/front/discounts
async fn discounts(State(state): State<AppState>) -> ApiResult<Json<Vec<FrontDiscount>>> {
    let key = format!("{FRONT_PREFIX}discounts");
    let discounts = get_or_insert_json(&state.cache, &key, ttl(&state), || {
        active_discounts(&state.db, Utc::now())
    })
    .await?;
    Ok(Json(discounts))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(products))
        .route("/products/{slug}", get(product))
        .route("/categories", get(categories))
        .route("/discounts", get(discounts))
}
