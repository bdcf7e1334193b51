//! # Supplier Repository

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::search_pattern;
use aria_core::Supplier;

const FILTER_SQL: &str = r#"
    WHERE (?1 IS NULL OR name REGEXP ?1 OR origin_country REGEXP ?1)
      AND (?2 IS NULL OR is_active = ?2)
"#;

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(supplier)
    }

    /// Lists suppliers by name.
    pub async fn list(
        &self,
        search: Option<&str>,
        is_active: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Supplier>> {
        let sql =
            format!("SELECT * FROM suppliers {FILTER_SQL} ORDER BY name, id LIMIT ?3 OFFSET ?4");

        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .bind(search_pattern(search))
            .bind(is_active)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(suppliers)
    }

    pub async fn count(&self, search: Option<&str>, is_active: Option<bool>) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM suppliers {FILTER_SQL}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(search_pattern(search))
            .bind(is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn insert<'e, E>(&self, executor: E, supplier: &Supplier) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_first_name, contact_last_name, email, phone,
                origin_country, website, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_first_name)
        .bind(&supplier.contact_last_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.origin_country)
        .bind(&supplier.website)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update<'e, E>(&self, executor: E, supplier: &Supplier) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %supplier.id, "Updating supplier");

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2,
                contact_first_name = ?3,
                contact_last_name = ?4,
                email = ?5,
                phone = ?6,
                origin_country = ?7,
                website = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_first_name)
        .bind(&supplier.contact_last_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.origin_country)
        .bind(&supplier.website)
        .bind(supplier.is_active)
        .bind(supplier.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", &supplier.id));
        }

        Ok(())
    }

    /// Deletes a supplier.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - products or kitchens still
    ///   reference it
    pub async fn delete<'e, E>(&self, executor: E, id: &str) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        Ok(())
    }

    /// Number of products and kitchens referencing a supplier.
    pub async fn dependents(&self, id: &str) -> DbResult<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products WHERE supplier_id = ?1),
                (SELECT COUNT(*) FROM kitchens WHERE supplier_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
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
    async fn test_crud() {
        let db = fixtures::test_db().await;
        let repo = db.suppliers();
        let mut supplier = fixtures::supplier("Marazzi");

        repo.insert(db.pool(), &supplier).await.unwrap();
        supplier.website = Some("https://marazzi.it".to_string());
        repo.update(db.pool(), &supplier).await.unwrap();

        let stored = repo.get_by_id(&supplier.id).await.unwrap().unwrap();
        assert_eq!(stored.website.as_deref(), Some("https://marazzi.it"));

        assert_eq!(repo.count(Some("mara"), None).await.unwrap(), 1);
        assert_eq!(repo.count(Some("italia"), Some(true)).await.unwrap(), 1);
        assert_eq!(repo.count(Some("spania"), None).await.unwrap(), 0);

        repo.delete(db.pool(), &supplier.id).await.unwrap();
        assert!(repo.get_by_id(&supplier.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(db.pool(), &supplier.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_with_products_is_restricted() {
        let db = fixtures::test_db().await;
        let supplier = fixtures::supplier("Marazzi");
        db.suppliers().insert(db.pool(), &supplier).await.unwrap();
        db.products()
            .insert(db.pool(), &fixtures::product("hvit-flis", &supplier.id))
            .await
            .unwrap();

        assert_eq!(db.suppliers().dependents(&supplier.id).await.unwrap(), (1, 0));

        let err = db.suppliers().delete(db.pool(), &supplier.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
