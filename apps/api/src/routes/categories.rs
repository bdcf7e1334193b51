//! `/api/categories`
//!
//! Anyone may read; customers only see active categories.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Category, Page, Permission};

use crate::error::{ApiResult, ApplicationError};
use crate::extract::{require, ApiJson, ApiPath, ApiQuery, CurrentUser, OptionalUser, Pagination};
use crate::selectors::catalogue::{self, CategoryDetail};
use crate::services::catalogue::{category_create, category_delete, category_update, CategoryInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    pub search: Option<String>,
    /// Honoured for staff only.
    pub is_active: Option<bool>,
}

/// GET /api/categories
async fn list(
    State(state): State<AppState>,
    user: OptionalUser,
    ApiQuery(query): ApiQuery<CategoryQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<Category>>> {
    let is_active = if user.is_staff() { query.is_active } else { Some(true) };

    let (rows, count) = catalogue::category_list(
        &state.db,
        query.search.as_deref(),
        is_active,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/categories/{id}
async fn detail(
    State(state): State<AppState>,
    user: OptionalUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<CategoryDetail>> {
    let detail = catalogue::category_detail(&state.db, &id).await?;
    if !detail.category.is_active && !user.is_staff() {
        return Err(ApplicationError::not_found(format!("Category not found: {id}")));
    }
    Ok(Json(detail))
}

/// POST /api/categories
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    require(&user, Permission::HasCategoriesEdit)?;
    let category = category_create(&state.db, &user.user, input).await?;
    state.cache.invalidate_front().await;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<Json<Category>> {
    require(&user, Permission::HasCategoriesEdit)?;
    let category = category_update(&state.db, &user.user, &id, input).await?;
    state.cache.invalidate_front().await;
    Ok(Json(category))
}

/// DELETE /api/categories/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasCategoriesEdit)?;
    category_delete(&state.db, &user.user, &id).await?;
    state.cache.invalidate_front().await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(delete))
}
