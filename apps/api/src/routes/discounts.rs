//! `/api/discounts`: back-office discount management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Page, Permission};

use crate::error::ApiResult;
use crate::extract::{require, require_staff, ApiJson, ApiPath, ApiQuery, CurrentUser, Pagination};
use crate::selectors::discounts::{self as selectors, DiscountDetail, DiscountSummary};
use crate::services::discounts::{discount_create, discount_delete, discount_update, DiscountInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuery {
    pub search: Option<String>,
}

/// GET /api/discounts
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<DiscountQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<DiscountSummary>>> {
    require_staff(&user)?;
    let (rows, count) = selectors::discount_list(
        &state.db,
        query.search.as_deref(),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/discounts/{id}
async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<DiscountDetail>> {
    require_staff(&user)?;
    Ok(Json(selectors::discount_detail(&state.db, &id).await?))
}

/// POST /api/discounts
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<DiscountInput>,
) -> ApiResult<(StatusCode, Json<DiscountDetail>)> {
    require(&user, Permission::HasDiscountsEdit)?;
    let detail = discount_create(&state.db, &user.user, input).await?;
    state.cache.invalidate_front().await;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/discounts/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<DiscountInput>,
) -> ApiResult<Json<DiscountDetail>> {
    require(&user, Permission::HasDiscountsEdit)?;
    let detail = discount_update(&state.db, &user.user, &id, input).await?;
    state.cache.invalidate_front().await;
    Ok(Json(detail))
}

/// DELETE /api/discounts/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasDiscountsEdit)?;
    discount_delete(&state.db, &user.user, &id).await?;
    state.cache.invalidate_front().await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(delete))
}
