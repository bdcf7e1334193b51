//! # User Repository
//!
//! Customers, employees and superusers share one table; `is_staff` and
//! `is_superuser` tell them apart. Back-office permissions are stored as
//! codename rows in `user_permissions`.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::search_pattern;
use aria_core::User;

/// Filters for user listings. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    /// Matched against email, first and last name.
    pub search: Option<String>,
}

const FILTER_SQL: &str = r#"
    WHERE (?1 IS NULL OR is_staff = ?1)
      AND (?2 IS NULL OR is_active = ?2)
      AND (?3 IS NULL
           OR email REGEXP ?3
           OR first_name REGEXP ?3
           OR last_name REGEXP ?3)
"#;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Looks a user up by email. The email must already be lowercased.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Lists users, newest first.
    pub async fn list(&self, filter: &UserFilter, limit: i64, offset: i64) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT * FROM users {FILTER_SQL} ORDER BY created_at DESC, id LIMIT ?4 OFFSET ?5"
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(filter.is_staff)
            .bind(filter.is_active)
            .bind(search_pattern(filter.search.as_deref()))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    pub async fn count(&self, filter: &UserFilter) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM users {FILTER_SQL}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.is_staff)
            .bind(filter.is_active)
            .bind(search_pattern(filter.search.as_deref()))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a user.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn insert<'e, E>(&self, executor: E, user: &User) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, first_name, last_name, phone, password_hash,
                is_active, is_staff, is_superuser, last_login, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Updates profile fields and flags. The password hash is left alone.
    pub async fn update<'e, E>(&self, executor: E, user: &User) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %user.id, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = ?2,
                first_name = ?3,
                last_name = ?4,
                phone = ?5,
                is_active = ?6,
                is_staff = ?7,
                is_superuser = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", &user.id));
        }

        Ok(())
    }

    pub async fn set_password<'e, E>(
        &self,
        executor: E,
        id: &str,
        password_hash: &str,
    ) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(password_hash)
                .bind(Utc::now())
                .execute(executor)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    pub async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn total(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    /// Permission codenames granted to a user, sorted.
    pub async fn permissions(&self, user_id: &str) -> DbResult<Vec<String>> {
        let codenames: Vec<String> = sqlx::query_scalar(
            "SELECT codename FROM user_permissions WHERE user_id = ?1 ORDER BY codename",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(codenames)
    }

    /// Grants one permission. Granting twice is a no-op.
    pub async fn grant_permission<'e, E>(
        &self,
        executor: E,
        user_id: &str,
        codename: &str,
    ) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, codename) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(codename)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Replaces every permission of a user.
    pub async fn set_permissions(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        codenames: &[String],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        for codename in codenames {
            self.grant_permission(&mut *conn, user_id, codename).await?;
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = fixtures::test_db().await;
        let repo = db.users();
        let user = fixtures::user("kari@flis.no");

        repo.insert(db.pool(), &user).await.unwrap();

        let by_email = repo.get_by_email("kari@flis.no").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let db = fixtures::test_db().await;
        let repo = db.users();

        repo.insert(db.pool(), &fixtures::user("kari@flis.no")).await.unwrap();
        let err = repo
            .insert(db.pool(), &fixtures::user("kari@flis.no"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_filters() {
        let db = fixtures::test_db().await;
        let repo = db.users();

        let mut employee = fixtures::user("ola@flis.no");
        employee.is_staff = true;
        employee.first_name = "Ola".to_string();
        repo.insert(db.pool(), &employee).await.unwrap();
        repo.insert(db.pool(), &fixtures::user("kunde@gmail.com")).await.unwrap();

        let staff = UserFilter {
            is_staff: Some(true),
            ..Default::default()
        };
        assert_eq!(repo.count(&staff).await.unwrap(), 1);
        assert_eq!(repo.list(&staff, 10, 0).await.unwrap()[0].id, employee.id);

        let search = UserFilter {
            search: Some("OLA".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.count(&search).await.unwrap(), 1);
        assert_eq!(repo.count(&UserFilter::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_and_password() {
        let db = fixtures::test_db().await;
        let repo = db.users();
        let mut user = fixtures::user("kari@flis.no");
        repo.insert(db.pool(), &user).await.unwrap();

        user.phone = Some("+47 900 00 000".to_string());
        user.is_active = false;
        repo.update(db.pool(), &user).await.unwrap();
        repo.set_password(db.pool(), &user.id, "new-hash").await.unwrap();

        let stored = repo.get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("+47 900 00 000"));
        assert!(!stored.is_active);
        assert_eq!(stored.password_hash, "new-hash");

        let ghost = fixtures::user("ghost@flis.no");
        assert!(matches!(
            repo.update(db.pool(), &ghost).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_permissions_replace() {
        let db = fixtures::test_db().await;
        let repo = db.users();
        let user = fixtures::user("ola@flis.no");
        repo.insert(db.pool(), &user).await.unwrap();

        repo.grant_permission(db.pool(), &user.id, "has_products_edit").await.unwrap();
        repo.grant_permission(db.pool(), &user.id, "has_products_edit").await.unwrap();
        assert_eq!(repo.permissions(&user.id).await.unwrap(), vec!["has_products_edit"]);

        let mut tx = db.begin().await.unwrap();
        repo.set_permissions(
            &mut tx,
            &user.id,
            &["has_notes_edit".to_string(), "has_discounts_edit".to_string()],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            repo.permissions(&user.id).await.unwrap(),
            vec!["has_discounts_edit", "has_notes_edit"]
        );
    }
}
