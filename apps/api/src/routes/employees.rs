//! `/api/employees`: staff accounts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Page, Permission, User};
use aria_db::UserFilter;

use crate::error::ApiResult;
use crate::extract::{require, require_staff, ApiJson, ApiPath, ApiQuery, CurrentUser, Pagination};
use crate::selectors::users::{self as selectors, UserDetail};
use crate::services::users::{
    employee_create, employee_deactivate, employee_grant_permission, employee_update, EmployeeInput,
    EmployeeUpdate, PermissionGrant,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /api/employees
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<EmployeeQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<User>>> {
    require_staff(&user)?;
    let filter = UserFilter {
        is_staff: Some(true),
        is_active: query.is_active,
        search: query.search,
    };
    let (rows, count) =
        selectors::user_list(&state.db, &filter, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/employees/{id}
async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<UserDetail>> {
    require_staff(&user)?;
    Ok(Json(selectors::employee_detail(&state.db, &id).await?))
}

/// POST /api/employees
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<EmployeeInput>,
) -> ApiResult<(StatusCode, Json<UserDetail>)> {
    require(&user, Permission::HasEmployeesEdit)?;
    let detail = employee_create(&state.db, &user, input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/employees/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<EmployeeUpdate>,
) -> ApiResult<Json<UserDetail>> {
    require(&user, Permission::HasEmployeesEdit)?;
    Ok(Json(employee_update(&state.db, &user, &id, input).await?))
}

/// POST /api/employees/{id}/deactivate
async fn deactivate(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<UserDetail>> {
    require(&user, Permission::HasEmployeesEdit)?;
    Ok(Json(employee_deactivate(&state.db, &user, &id).await?))
}

/// POST /api/employees/{id}/permissions
async fn grant_permission(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<PermissionGrant>,
) -> ApiResult<Json<UserDetail>> {
    require(&user, Permission::HasEmployeesEdit)?;
    Ok(Json(employee_grant_permission(&state.db, &user, &id, input).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).put(update))
        .route("/{id}/deactivate", post(deactivate))
        .route("/{id}/permissions", post(grant_permission))
}
