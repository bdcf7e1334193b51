//! `/api/auth`: token pairs.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, TokenPair};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::selectors::users::{with_permissions, UserDetail};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserDetail,
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, tokens) = AuthService::new(&state.db, &state.jwt)
        .login(&body.email, &body.password)
        .await?;
    let user = with_permissions(&state.db, user).await?;
    Ok(Json(LoginResponse { tokens, user }))
}

/// POST /api/auth/refresh
///
/// The submitted refresh token is blacklisted; use the returned one next.
async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let tokens = AuthService::new(&state.db, &state.jwt).refresh(&body.refresh).await?;
    Ok(Json(tokens))
}

/// POST /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<StatusCode> {
    AuthService::new(&state.db, &state.jwt).logout(&body.refresh).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}
