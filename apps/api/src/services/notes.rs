//! Note mutations.
//!
//! Anyone with `has_notes_edit` may add a note. Only its author, or a
//! superuser, may change or remove it afterwards.

use chrono::Utc;
use serde::Deserialize;

use aria_core::validation::validate_note_content;
use aria_core::{CoreError, LogAction, NoteEntry, ResourceType, User};
use aria_db::Database;

use super::{commit, log_entry, new_id};
use crate::error::ApiResult;
use crate::selectors::found;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub content: String,
}

fn ensure_author(actor: &User, note: &NoteEntry) -> ApiResult<()> {
    if actor.is_superuser || actor.id == note.author_id {
        return Ok(());
    }
    Err(CoreError::Forbidden("Only the author can change this note".to_string()).into())
}

pub async fn note_create(db: &Database, actor: &User, input: NoteInput) -> ApiResult<NoteEntry> {
    let content = validate_note_content(&input.content)?;
    let resource_id = input.resource_id.trim().to_string();
    if resource_id.is_empty() {
        return Err(aria_core::ValidationError::Required {
            field: "resourceId".to_string(),
        }
        .into());
    }

    let now = Utc::now();
    let note = NoteEntry {
        id: new_id(),
        author_id: actor.id.clone(),
        resource_type: input.resource_type,
        resource_id,
        content,
        created_at: now,
        updated_at: now,
    };

    let mut tx = db.begin().await?;
    db.notes().insert(&mut *tx, &note).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Note,
                &note.id,
                LogAction::Create,
                format!("Added note on {} {}", note.resource_type.as_str(), note.resource_id),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(note)
}

pub async fn note_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: NoteUpdate,
) -> ApiResult<NoteEntry> {
    let mut note = found(db.notes().get_by_id(id).await?, "Note", id)?;
    ensure_author(actor, &note)?;
    note.content = validate_note_content(&input.content)?;
    note.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.notes().update_content(&mut *tx, id, &note.content, note.updated_at).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(actor, ResourceType::Note, id, LogAction::Update, "Edited note"),
        )
        .await?;
    commit(tx).await?;

    Ok(note)
}

pub async fn note_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let note = found(db.notes().get_by_id(id).await?, "Note", id)?;
    ensure_author(actor, &note)?;

    let mut tx = db.begin().await?;
    db.notes().delete(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(actor, ResourceType::Note, id, LogAction::Delete, "Deleted note"),
        )
        .await?;
    commit(tx).await?;

    Ok(())
}
