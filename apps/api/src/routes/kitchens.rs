//! `/api/kitchens`
//!
//! Customers see available kitchens only; staff see every status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Kitchen, Page, Permission, ProductStatus};

use crate::error::ApiResult;
use crate::extract::{require, ApiJson, ApiPath, ApiQuery, CurrentUser, OptionalUser, Pagination};
use crate::selectors::kitchens::{kitchen_detail, kitchen_list, KitchenDetail};
use crate::services::kitchens::{kitchen_create, kitchen_delete, kitchen_update, KitchenInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenQuery {
    pub search: Option<String>,
    /// Honoured for staff only.
    pub status: Option<ProductStatus>,
    pub supplier_id: Option<String>,
}

/// GET /api/kitchens
async fn list(
    State(state): State<AppState>,
    user: OptionalUser,
    ApiQuery(query): ApiQuery<KitchenQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<Kitchen>>> {
    let status = if user.is_staff() {
        query.status
    } else {
        Some(ProductStatus::Available)
    };

    let (rows, count) = kitchen_list(
        &state.db,
        query.search.as_deref(),
        status,
        query.supplier_id.as_deref(),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/kitchens/{id}
async fn detail(
    State(state): State<AppState>,
    user: OptionalUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<KitchenDetail>> {
    Ok(Json(kitchen_detail(&state.db, &id, !user.is_staff()).await?))
}

/// POST /api/kitchens
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<KitchenInput>,
) -> ApiResult<(StatusCode, Json<KitchenDetail>)> {
    require(&user, Permission::HasKitchensEdit)?;
    let detail = kitchen_create(&state.db, &user.user, input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/kitchens/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<KitchenInput>,
) -> ApiResult<Json<KitchenDetail>> {
    require(&user, Permission::HasKitchensEdit)?;
    Ok(Json(kitchen_update(&state.db, &user.user, &id, input).await?))
}

/// DELETE /api/kitchens/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasKitchensEdit)?;
    kitchen_delete(&state.db, &user.user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(delete))
}
