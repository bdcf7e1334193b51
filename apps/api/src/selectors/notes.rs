//! Notes and the audit log, both keyed by `(resource_type, resource_id)`.

use aria_core::{LogEntry, NoteEntry, ResourceType};
use aria_db::Database;

use crate::error::ApiResult;

pub async fn note_list(
    db: &Database,
    resource_type: ResourceType,
    resource_id: &str,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<NoteEntry>, i64)> {
    let notes = db.notes();
    Ok((
        notes.list_for(resource_type, resource_id, limit, offset).await?,
        notes.count_for(resource_type, resource_id).await?,
    ))
}

pub async fn log_list(
    db: &Database,
    resource_type: ResourceType,
    resource_id: &str,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<LogEntry>, i64)> {
    let logs = db.logs();
    Ok((
        logs.list_for(resource_type, resource_id, limit, offset).await?,
        logs.count_for(resource_type, resource_id).await?,
    ))
}
