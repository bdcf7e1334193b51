//! # Note Repository
//!
//! Notes hang off any record through `(resource_type, resource_id)`; there
//! is no foreign key to the record itself.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use aria_core::{NoteEntry, ResourceType};

#[derive(Debug, Clone)]
pub struct NoteRepository {
    pool: SqlitePool,
}

impl NoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NoteRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<NoteEntry>> {
        let note = sqlx::query_as::<_, NoteEntry>("SELECT * FROM note_entries WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(note)
    }

    /// Notes on one record, newest first.
    pub async fn list_for(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<NoteEntry>> {
        let notes = sqlx::query_as::<_, NoteEntry>(
            r#"
            SELECT * FROM note_entries
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

        Ok(notes)
    }

    pub async fn count_for(&self, resource_type: ResourceType, resource_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM note_entries WHERE resource_type = ?1 AND resource_id = ?2",
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn insert<'e, E>(&self, executor: E, note: &NoteEntry) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(
            resource_type = note.resource_type.as_str(),
            resource_id = %note.resource_id,
            "Inserting note"
        );

        sqlx::query(
            r#"
            INSERT INTO note_entries (
                id, author_id, resource_type, resource_id, content, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&note.id)
        .bind(&note.author_id)
        .bind(note.resource_type)
        .bind(&note.resource_id)
        .bind(&note.content)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update_content<'e, E>(
        &self,
        executor: E,
        id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE note_entries SET content = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(content)
                .bind(updated_at)
                .execute(executor)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Note", id));
        }

        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM note_entries WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Note", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use uuid::Uuid;

    fn note(author_id: &str, resource_id: &str, content: &str) -> NoteEntry {
        NoteEntry {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            resource_type: ResourceType::Product,
            resource_id: resource_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notes_per_resource() {
        let db = fixtures::test_db().await;
        let author = fixtures::user("ola@flis.no");
        db.users().insert(db.pool(), &author).await.unwrap();

        let repo = db.notes();
        let first = note(&author.id, "p1", "Ring leverandør");
        repo.insert(db.pool(), &first).await.unwrap();
        repo.insert(db.pool(), &note(&author.id, "p2", "Annen vare")).await.unwrap();

        assert_eq!(repo.count_for(ResourceType::Product, "p1").await.unwrap(), 1);
        assert_eq!(repo.count_for(ResourceType::Supplier, "p1").await.unwrap(), 0);

        repo.update_content(db.pool(), &first.id, "Leverandør ringt", Utc::now())
            .await
            .unwrap();
        let listed = repo.list_for(ResourceType::Product, "p1", 10, 0).await.unwrap();
        assert_eq!(listed[0].content, "Leverandør ringt");
        assert_eq!(listed[0].resource_type, ResourceType::Product);

        repo.delete(db.pool(), &first.id).await.unwrap();
        assert!(matches!(
            repo.delete(db.pool(), &first.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
