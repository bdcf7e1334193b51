//! `/api/products`
//!
//! Back-office product management plus the attribute catalogues (variants,
//! sizes, colors and shapes). Product reads here are staff-only; the public
//! storefront reads go through `/api/front`. Attribute lists are public.
//!
//! ```text
//! /api/products
//!   ├── /                     GET list, POST create
//!   ├── /{id}                 GET, PUT, DELETE
//!   ├── /{id}/options         POST
//!   ├── /options/{id}         PUT, DELETE
//!   └── /variants | /sizes | /colors | /shapes    GET list, POST create
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Color, Page, Permission, ProductStatus, Shape, Variant};
use aria_db::ProductFilter;

use crate::error::ApiResult;
use crate::extract::{require, require_staff, ApiJson, ApiPath, ApiQuery, CurrentUser, Pagination};
use crate::selectors::catalogue;
use crate::selectors::products::{
    product_detail, product_list, ProductDetail, ProductListItem, SizeDetail,
};
use crate::services::catalogue::{
    color_create, shape_create, size_create, variant_create, ColorInput, ShapeInput, SizeInput,
    VariantInput,
};
use crate::services::products::{
    option_create, option_delete, option_update, product_create, product_delete, product_update,
    OptionInput, ProductInput,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    pub supplier_id: Option<String>,
    pub category_id: Option<String>,
    pub color_id: Option<String>,
    pub shape_id: Option<String>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        ProductFilter {
            search: query.search,
            status: query.status,
            supplier_id: query.supplier_id,
            category_id: query.category_id,
            color_id: query.color_id,
            shape_id: query.shape_id,
            has_available_options: false,
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/products
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<ProductListItem>>> {
    require_staff(&user)?;
    let filter = ProductFilter::from(query);
    let (rows, count) =
        product_list(&state.db, &filter, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/products/{id}
async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ProductDetail>> {
    require_staff(&user)?;
    Ok(Json(product_detail(&state.db, &id).await?))
}

/// POST /api/products
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    require(&user, Permission::HasProductsEdit)?;
    let detail = product_create(&state.db, &user.user, input).await?;
    state.cache.invalidate_front().await;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/products/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Json<ProductDetail>> {
    require(&user, Permission::HasProductsEdit)?;
    let detail = product_update(&state.db, &user.user, &id, input).await?;
    state.cache.invalidate_front().await;
    Ok(Json(detail))
}

/// DELETE /api/products/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasProductsEdit)?;
    product_delete(&state.db, &user.user, &id).await?;
    state.cache.invalidate_front().await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Options
// =============================================================================

/// POST /api/products/{id}/options
async fn create_option(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(product_id): ApiPath<String>,
    ApiJson(input): ApiJson<OptionInput>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    require(&user, Permission::HasProductsEdit)?;
    let detail = option_create(&state.db, &user.user, &product_id, input).await?;
    state.cache.invalidate_front().await;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/products/options/{id}
async fn update_option(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<OptionInput>,
) -> ApiResult<Json<ProductDetail>> {
    require(&user, Permission::HasProductsEdit)?;
    let detail = option_update(&state.db, &user.user, &id, input).await?;
    state.cache.invalidate_front().await;
    Ok(Json(detail))
}

/// DELETE /api/products/options/{id}
async fn delete_option(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasProductsEdit)?;
    option_delete(&state.db, &user.user, &id).await?;
    state.cache.invalidate_front().await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Attributes
// =============================================================================

/// GET /api/products/variants
async fn variants(
    State(state): State<AppState>,
    pagination: Pagination,
) -> ApiResult<Json<Page<Variant>>> {
    let (rows, count) =
        catalogue::variant_list(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// POST /api/products/variants
async fn create_variant(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<VariantInput>,
) -> ApiResult<(StatusCode, Json<Variant>)> {
    require(&user, Permission::HasProductsEdit)?;
    let variant = variant_create(&state.db, &user.user, input).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// GET /api/products/sizes
async fn sizes(
    State(state): State<AppState>,
    pagination: Pagination,
) -> ApiResult<Json<Page<SizeDetail>>> {
    let (rows, count) =
        catalogue::size_list(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// POST /api/products/sizes
async fn create_size(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<SizeInput>,
) -> ApiResult<(StatusCode, Json<SizeDetail>)> {
    require(&user, Permission::HasProductsEdit)?;
    let size = size_create(&state.db, &user.user, input).await?;
    Ok((StatusCode::CREATED, Json(SizeDetail::from(size))))
}

/// GET /api/products/colors
async fn colors(
    State(state): State<AppState>,
    pagination: Pagination,
) -> ApiResult<Json<Page<Color>>> {
    let (rows, count) =
        catalogue::color_list(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// POST /api/products/colors
async fn create_color(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<ColorInput>,
) -> ApiResult<(StatusCode, Json<Color>)> {
    require(&user, Permission::HasProductsEdit)?;
    let color = color_create(&state.db, &user.user, input).await?;
    state.cache.invalidate_front().await;
    Ok((StatusCode::CREATED, Json(color)))
}

/// GET /api/products/shapes
async fn shapes(
    State(state): State<AppState>,
    pagination: Pagination,
) -> ApiResult<Json<Page<Shape>>> {
    let (rows, count) =
        catalogue::shape_list(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// POST /api/products/shapes
async fn create_shape(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<ShapeInput>,
) -> ApiResult<(StatusCode, Json<Shape>)> {
    require(&user, Permission::HasProductsEdit)?;
    let shape = shape_create(&state.db, &user.user, input).await?;
    state.cache.invalidate_front().await;
    Ok((StatusCode::CREATED, Json(shape)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/variants", get(variants).post(create_variant))
        .route("/sizes", get(sizes).post(create_size))
        .route("/colors", get(colors).post(create_color))
        .route("/shapes", get(shapes).post(create_shape))
        .route("/options/{id}", put(update_option).delete(delete_option))
        .route("/{id}", get(detail).put(update).delete(delete))
        .route("/{id}/options", post(create_option))
}
