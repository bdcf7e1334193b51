//! # Log Repository
//!
//! Append-only audit log. Every service writes one entry per mutation, in
//! the same transaction as the mutation itself.

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::error::DbResult;
use aria_core::{LogEntry, ResourceType};

#[derive(Debug, Clone)]
pub struct LogRepository {
    pool: SqlitePool,
}

impl LogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LogRepository { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, entry: &LogEntry) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO log_entries (
                id, user_id, resource_type, resource_id, action, change_message, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.resource_type)
        .bind(&entry.resource_id)
        .bind(entry.action)
        .bind(&entry.change_message)
        .bind(entry.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Log entries for one record, newest first.
    pub async fn list_for(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<LogEntry>> {
        let entries = sqlx::query_as::<_, LogEntry>(
            r#"
            SELECT * FROM log_entries
            WHERE resource_type = ?1 AND resource_id = ?2
            ORDER BY created_at DESC, id
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(resource_type)
        .bind(resource_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn count_for(&self, resource_type: ResourceType, resource_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM log_entries WHERE resource_type = ?1 AND resource_id = ?2",
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use aria_core::LogAction;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_transactional_log_rolls_back_with_mutation() {
        let db = fixtures::test_db().await;
        let supplier = fixtures::supplier("Marazzi");

        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            resource_type: ResourceType::Supplier,
            resource_id: supplier.id.clone(),
            action: LogAction::Create,
            change_message: "Created supplier".to_string(),
            created_at: Utc::now(),
        };

        let mut tx = db.begin().await.unwrap();
        db.suppliers().insert(&mut *tx, &supplier).await.unwrap();
        db.logs().insert(&mut *tx, &entry).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(db.logs().count_for(ResourceType::Supplier, &supplier.id).await.unwrap(), 0);

        let mut tx = db.begin().await.unwrap();
        db.suppliers().insert(&mut *tx, &supplier).await.unwrap();
        db.logs().insert(&mut *tx, &entry).await.unwrap();
        tx.commit().await.unwrap();

        let entries = db
            .logs()
            .list_for(ResourceType::Supplier, &supplier.id, 10, 0)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, LogAction::Create);
    }
}
