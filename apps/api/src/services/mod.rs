//! # Services
//!
//! One function per mutation. Every service writes its change and a
//! [`LogEntry`] in the same transaction, then returns the updated record.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  route ──► service                                                      │
//! │              ├── validate input (aria_core::validation)                 │
//! │              ├── reads that need the pool                               │
//! │              ├── tx = db.begin()                                        │
//! │              │     ├── repository writes (&mut *tx)                     │
//! │              │     └── logs().insert(&mut *tx, entry)                   │
//! │              └── tx.commit()                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads happen before `begin()`: an in-memory database has a single
//! connection, and the open transaction holds it.

pub mod catalogue;
pub mod discounts;
pub mod kitchens;
pub mod notes;
pub mod products;
pub mod suppliers;
pub mod users;

use chrono::Utc;
use uuid::Uuid;

use aria_core::slug::slugify;
use aria_core::validation::validate_slug;
use aria_core::{LogAction, LogEntry, ResourceType, User};
use aria_db::{DbError, Tx};

use crate::error::{ApiResult, ApplicationError};

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds an audit entry for `actor`.
pub(crate) fn log_entry(
    actor: &User,
    resource_type: ResourceType,
    resource_id: &str,
    action: LogAction,
    message: impl Into<String>,
) -> LogEntry {
    LogEntry {
        id: new_id(),
        user_id: Some(actor.id.clone()),
        resource_type,
        resource_id: resource_id.to_string(),
        action,
        change_message: message.into(),
        created_at: Utc::now(),
    }
}

pub(crate) async fn commit(tx: Tx) -> ApiResult<()> {
    tx.commit().await.map_err(DbError::from)?;
    Ok(())
}

/// Trims an optional text field; blank becomes `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The given slug, or one derived from `name`.
pub(crate) fn resolve_slug(explicit: Option<String>, name: &str) -> ApiResult<String> {
    let slug = clean(explicit).unwrap_or_else(|| slugify(name));
    validate_slug(&slug)?;
    Ok(slug)
}

/// Rejects ids `existing` does not contain.
pub(crate) fn require_all(field: &str, wanted: &[String], existing: &[String]) -> ApiResult<()> {
    let missing: Vec<&str> = wanted
        .iter()
        .filter(|id| !existing.contains(id))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    Err(ApplicationError::validation(format!("Unknown {field}"))
        .with_field(field, format!("unknown id(s): {}", missing.join(", "))))
}

pub(crate) fn dedup(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug() {
        assert_eq!(resolve_slug(None, "Hvit Blank Flis").unwrap(), "hvit-blank-flis");
        assert_eq!(resolve_slug(Some(" egen-slug ".to_string()), "x").unwrap(), "egen-slug");
        assert!(resolve_slug(Some("Ikke Gyldig".to_string()), "x").is_err());
        assert!(resolve_slug(None, "!!!").is_err());
    }

    #[test]
    fn test_require_all() {
        let existing = vec!["a".to_string()];
        assert!(require_all("colorIds", &["a".to_string()], &existing).is_ok());

        let err =
            require_all("colorIds", &dedup(vec!["b".into(), "a".into(), "b".into()]), &existing)
                .unwrap_err();
        assert_eq!(err.errors.unwrap()["colorIds"], vec!["unknown id(s): b".to_string()]);
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(Some("  Italia ".to_string())).as_deref(), Some("Italia"));
        assert_eq!(clean(Some("   ".to_string())), None);
        assert_eq!(clean(None), None);
    }
}
