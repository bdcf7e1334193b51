//! `/api/notes`: staff notes on any record.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use aria_core::{NoteEntry, Page, Permission, ResourceType};

use crate::error::ApiResult;
use crate::extract::{require, require_staff, ApiJson, ApiPath, CurrentUser, Pagination};
use crate::selectors::notes::note_list;
use crate::services::notes::{note_create, note_delete, note_update, NoteInput, NoteUpdate};
use crate::AppState;

/// GET /api/notes/{resource_type}/{resource_id}
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((resource_type, resource_id)): ApiPath<(ResourceType, String)>,
    pagination: Pagination,
) -> ApiResult<Json<Page<NoteEntry>>> {
    require_staff(&user)?;
    let (rows, count) = note_list(
        &state.db,
        resource_type,
        &resource_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(Json(pagination.page(rows, count, state.config.base_url())))
}

/// POST /api/notes
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<NoteInput>,
) -> ApiResult<(StatusCode, Json<NoteEntry>)> {
    require(&user, Permission::HasNotesEdit)?;
    let note = note_create(&state.db, &user.user, input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /api/notes/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<NoteUpdate>,
) -> ApiResult<Json<NoteEntry>> {
    require(&user, Permission::HasNotesEdit)?;
    Ok(Json(note_update(&state.db, &user.user, &id, input).await?))
}

/// DELETE /api/notes/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    require(&user, Permission::HasNotesEdit)?;
    note_delete(&state.db, &user.user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(delete))
        .route("/{resource_type}/{resource_id}", get(list))
}
