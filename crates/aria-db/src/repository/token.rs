//! # Token Repository
//!
//! Persistence behind refresh-token rotation.
//!
//! ```text
//! login / refresh ──► insert_outstanding(jti)
//! refresh / logout ─► blacklist(outstanding.id)
//! every refresh ────► is_blacklisted(jti)?
//! housekeeping ─────► flush_expired(now)   (blacklist rows cascade)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use aria_core::OutstandingToken;

#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TokenRepository { pool }
    }

    pub async fn insert_outstanding<'e, E>(
        &self,
        executor: E,
        token: &OutstandingToken,
    ) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(user_id = %token.user_id, jti = %token.jti, "Recording outstanding token");

        sqlx::query(
            r#"
            INSERT INTO outstanding_tokens (id, user_id, jti, token, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.jti)
        .bind(&token.token)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn get_outstanding_by_jti(&self, jti: &str) -> DbResult<Option<OutstandingToken>> {
        let token = sqlx::query_as::<_, OutstandingToken>(
            "SELECT * FROM outstanding_tokens WHERE jti = ?1",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn is_blacklisted(&self, jti: &str) -> DbResult<bool> {
        let blacklisted: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM blacklisted_tokens b
                INNER JOIN outstanding_tokens o ON o.id = b.token_id
                WHERE o.jti = ?1
            )
            "#,
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;

        Ok(blacklisted)
    }

    /// Blacklists an outstanding token.
    ///
    /// ## Returns
    /// `true` when this call blacklisted it, `false` when it already was.
    pub async fn blacklist<'e, E>(&self, executor: E, token_id: &str) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO blacklisted_tokens (id, token_id, blacklisted_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(token_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Blacklists every outstanding token of a user (deactivation).
    pub async fn blacklist_all_for_user<'e, E>(&self, executor: E, user_id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO blacklisted_tokens (id, token_id, blacklisted_at)
            SELECT lower(hex(randomblob(16))), o.id, ?2
            FROM outstanding_tokens o
            WHERE o.user_id = ?1
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes outstanding tokens that expired before `now`.
    ///
    /// Their blacklist rows go with them (ON DELETE CASCADE).
    pub async fn flush_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM outstanding_tokens WHERE julianday(expires_at) < julianday(?1)",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(flushed = result.rows_affected(), "Flushed expired tokens");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use chrono::Duration;

    fn outstanding(user_id: &str, jti: &str, expires_at: DateTime<Utc>) -> OutstandingToken {
        OutstandingToken {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            jti: jti.to_string(),
            token: format!("token-{jti}"),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_blacklist_roundtrip() {
        let db = fixtures::test_db().await;
        let user = fixtures::user("kari@flis.no");
        db.users().insert(db.pool(), &user).await.unwrap();

        let repo = db.tokens();
        let token = outstanding(&user.id, "jti-1", Utc::now() + Duration::days(1));
        repo.insert_outstanding(db.pool(), &token).await.unwrap();

        assert!(!repo.is_blacklisted("jti-1").await.unwrap());
        assert!(repo.blacklist(db.pool(), &token.id).await.unwrap());
        assert!(!repo.blacklist(db.pool(), &token.id).await.unwrap());
        assert!(repo.is_blacklisted("jti-1").await.unwrap());
        assert!(!repo.is_blacklisted("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_blacklist_all_for_user() {
        let db = fixtures::test_db().await;
        let user = fixtures::user("kari@flis.no");
        db.users().insert(db.pool(), &user).await.unwrap();

        let repo = db.tokens();
        for jti in ["a", "b"] {
            repo.insert_outstanding(
                db.pool(),
                &outstanding(&user.id, jti, Utc::now() + Duration::days(1)),
            )
                .await
                .unwrap();
        }

        assert_eq!(repo.blacklist_all_for_user(db.pool(), &user.id).await.unwrap(), 2);
        assert!(repo.is_blacklisted("a").await.unwrap());
        assert!(repo.is_blacklisted("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_expired() {
        let db = fixtures::test_db().await;
        let user = fixtures::user("kari@flis.no");
        db.users().insert(db.pool(), &user).await.unwrap();

        let repo = db.tokens();
        let expired = outstanding(&user.id, "old", Utc::now() - Duration::hours(1));
        repo.insert_outstanding(db.pool(), &expired).await.unwrap();
        repo.blacklist(db.pool(), &expired.id).await.unwrap();
        repo.insert_outstanding(
            db.pool(),
            &outstanding(&user.id, "fresh", Utc::now() + Duration::days(1)),
        )
            .await
            .unwrap();

        assert_eq!(repo.flush_expired(Utc::now()).await.unwrap(), 1);
        assert!(repo.get_outstanding_by_jti("old").await.unwrap().is_none());
        assert!(repo.get_outstanding_by_jti("fresh").await.unwrap().is_some());
    }
}
