//! `/api/core`: health and the audit log.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use aria_core::{LogEntry, Page, Permission, ResourceType};

use crate::error::ApiResult;
use crate::extract::{require, ApiPath, CurrentUser, Pagination};
use crate::selectors;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// GET /api/core/health
///
/// 503 while the database does not answer.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let database = selectors::database_ok(&state.db).await;
    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(Health {
            status: if database { "ok" } else { "degraded" },
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// GET /api/core/logs/{resource_type}/{resource_id}
async fn logs(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((resource_type, resource_id)): ApiPath<(ResourceType, String)>,
    pagination: Pagination,
) -> ApiResult<Json<Page<LogEntry>>> {
    require(&user, Permission::HasLogsView)?;

    let (rows, count) = selectors::notes::log_list(
        &state.db,
        resource_type,
        &resource_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/logs/{resource_type}/{resource_id}", get(logs))
}
