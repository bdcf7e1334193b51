//! `/api/suppliers`: staff-only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Page, Permission, Supplier};

use crate::error::ApiResult;
use crate::extract::{require, require_staff, ApiJson, ApiPath, ApiQuery, CurrentUser, Pagination};
use crate::selectors::suppliers::{supplier_detail, supplier_list, SupplierDetail};
use crate::services::suppliers::{supplier_create, supplier_delete, supplier_update, SupplierInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /api/suppliers
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<SupplierQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<Supplier>>> {
    require_staff(&user)?;
    let (rows, count) = supplier_list(
        &state.db,
        query.search.as_deref(),
        query.is_active,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/suppliers/{id}
async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<SupplierDetail>> {
    require_staff(&user)?;
    Ok(Json(supplier_detail(&state.db, &id).await?))
}

/// POST /api/suppliers
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<SupplierInput>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    require(&user, Permission::HasSuppliersEdit)?;
    let supplier = supplier_create(&state.db, &user.user, input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// PUT /api/suppliers/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    require(&user, Permission::HasSuppliersEdit)?;
    let supplier = supplier_update(&state.db, &user.user, &id, input).await?;
    state.cache.invalidate_front().await;
    Ok(Json(supplier))
}

/// DELETE /api/suppliers/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasSuppliersEdit)?;
    supplier_delete(&state.db, &user.user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update).delete(delete))
}
