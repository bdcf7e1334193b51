//! `/api/users`: registration, the current user, and staff lookups.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use aria_core::{Page, User};
use aria_db::UserFilter;

use crate::error::ApiResult;
use crate::extract::{require_staff, ApiJson, ApiPath, ApiQuery, CurrentUser, Pagination};
use crate::selectors::users::{user_detail, user_list, with_permissions, UserDetail};
use crate::services::users::{register, update_me, RegisterInput, UpdateMeInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub search: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
}

/// POST /api/users/register
async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<UserDetail>)> {
    let user = register(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/me
async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<UserDetail>> {
    Ok(Json(with_permissions(&state.db, user.user).await?))
}

/// PUT /api/users/me
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<UpdateMeInput>,
) -> ApiResult<Json<UserDetail>> {
    Ok(Json(update_me(&state.db, &user.user, input).await?))
}

/// GET /api/users
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<UserQuery>,
    pagination: Pagination,
) -> ApiResult<Json<Page<User>>> {
    require_staff(&user)?;
    let filter = UserFilter {
        is_staff: query.is_staff,
        is_active: query.is_active,
        search: query.search,
    };
    let (rows, count) =
        user_list(&state.db, &filter, pagination.limit(), pagination.offset()).await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// GET /api/users/{id}
async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<UserDetail>> {
    require_staff(&user)?;
    Ok(Json(user_detail(&state.db, &id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/register", post(create))
        .route("/me", get(me).put(update))
        .route("/{id}", get(detail))
}
